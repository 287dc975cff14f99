use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use warrant_permissions::Restrictions;
use warrant_store::{Authorization, StoreError, StoreResult};

use super::*;

/// Store returning canned answers. Policies are returned unfiltered so that
/// the retriever's own matching is exercised.
#[derive(Default)]
struct ScriptedStore {
    eventual_count: usize,
    strong_count: usize,
    count_error: Option<String>,
    retrieve_error: Option<String>,
    stall_retrieve: bool,
    policies: Vec<Authorization>,
    count_calls: Mutex<Vec<ReadConsistency>>,
    retrieve_calls: AtomicUsize,
    last_query: Mutex<Option<PolicyQuery>>,
}

impl ScriptedStore {
    fn existing() -> Self {
        Self {
            eventual_count: 1,
            strong_count: 1,
            ..Self::default()
        }
    }

    fn with_policies(mut self, policies: Vec<Authorization>) -> Self {
        self.policies = policies;
        self
    }
}

#[async_trait]
impl PolicyStore for ScriptedStore {
    async fn count_namespaces(
        &self,
        _name: &str,
        consistency: ReadConsistency,
    ) -> StoreResult<usize> {
        self.count_calls.lock().unwrap().push(consistency);
        if let Some(err) = &self.count_error {
            return Err(StoreError::Connection(err.clone()));
        }
        Ok(match consistency {
            ReadConsistency::Eventual => self.eventual_count,
            ReadConsistency::Strong => self.strong_count,
        })
    }

    async fn retrieve_policies(&self, query: &PolicyQuery) -> StoreResult<Vec<Authorization>> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        if self.stall_retrieve {
            std::future::pending::<()>().await;
        }
        if let Some(err) = &self.retrieve_error {
            return Err(StoreError::Internal(err.clone()));
        }
        Ok(self.policies.clone())
    }
}

fn pol(permissions: &[&str], subnets: &[&str]) -> Authorization {
    Authorization::new(
        "/a",
        vec![vec!["color=blue".to_string()]],
        vec!["/a".to_string()],
        permissions.iter().copied(),
    )
    .with_id("1")
    .with_subnets(subnets.iter().copied())
}

fn blue() -> Vec<String> {
    vec!["color=blue".to_string()]
}

async fn run(
    store: ScriptedStore,
    ns: &str,
    options: RetrieverOptions,
) -> (Arc<ScriptedStore>, PolicyResult<PermissionMap>) {
    let store = Arc::new(store);
    let retriever = PolicyRetriever::new(store.clone());
    let result = retriever.permissions(&blue(), ns, &options).await;
    (store, result)
}

// -- namespace existence --

#[tokio::test]
async fn test_no_matching_policy() {
    let (_, perms) = run(ScriptedStore::existing(), "/a", RetrieverOptions::new()).await;
    assert!(perms.unwrap().is_empty());
}

#[tokio::test]
async fn test_single_policy_grants() {
    let store = ScriptedStore::existing().with_policies(vec![pol(&["things,get"], &[])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    let perms = perms.unwrap();

    assert_eq!(perms, PermissionMap::parse(&["things,get"], ""));
    assert!(perms.allows("get", "things"));
    assert!(!perms.allows("delete", "things"));
}

#[tokio::test]
async fn test_namespace_not_found_is_empty_after_strong_read() {
    let store = ScriptedStore::default().with_policies(vec![pol(&["things,get"], &[])]);
    let (store, perms) = run(store, "/a", RetrieverOptions::new()).await;

    assert!(perms.unwrap().is_empty());
    assert_eq!(
        *store.count_calls.lock().unwrap(),
        vec![ReadConsistency::Eventual, ReadConsistency::Strong]
    );
    assert_eq!(store.retrieve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_namespace_found_on_strong_read() {
    let store = ScriptedStore {
        strong_count: 1,
        ..ScriptedStore::default()
    }
    .with_policies(vec![pol(&["things,get"], &[])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert!(perms.unwrap().allows("get", "things"));
}

#[tokio::test]
async fn test_namespace_found_on_eventual_read_skips_strong() {
    let (store, _) = run(ScriptedStore::existing(), "/a", RetrieverOptions::new()).await;
    assert_eq!(
        *store.count_calls.lock().unwrap(),
        vec![ReadConsistency::Eventual]
    );
}

#[tokio::test]
async fn test_ambiguous_namespace_count_is_empty() {
    let store = ScriptedStore {
        eventual_count: 2,
        ..ScriptedStore::default()
    }
    .with_policies(vec![pol(&["things,get"], &[])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert!(perms.unwrap().is_empty());
}

#[tokio::test]
async fn test_root_namespace_is_not_counted() {
    let mut policy = pol(&["things,get"], &[]);
    policy.target_namespaces = vec!["/".to_string()];
    let store = ScriptedStore::default().with_policies(vec![policy]);
    let (store, perms) = run(store, "/", RetrieverOptions::new()).await;

    assert!(perms.unwrap().allows("get", "things"));
    assert!(store.count_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_count_failure_is_an_error() {
    let store = ScriptedStore {
        count_error: Some("noooo".to_string()),
        ..ScriptedStore::default()
    };
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert!(matches!(
        perms,
        Err(PolicyError::Store {
            step: StoreStep::CountNamespace,
            ..
        })
    ));
}

#[tokio::test]
async fn test_retrieve_failure_is_an_error() {
    let store = ScriptedStore {
        retrieve_error: Some("boom".to_string()),
        ..ScriptedStore::existing()
    };
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert_eq!(
        perms.unwrap_err().to_string(),
        "unable to retrieve api authorizations: storage error: boom"
    );
}

#[tokio::test]
async fn test_query_carries_claims_and_namespace() {
    let store = Arc::new(ScriptedStore::existing());
    let retriever = PolicyRetriever::new(store.clone());
    let claims = vec![
        "color=blue".to_string(),
        "@issuer=https://x".to_string(),
        "color=blue".to_string(),
    ];
    retriever
        .permissions(&claims, "/a", &RetrieverOptions::new())
        .await
        .unwrap();

    let query = store.last_query.lock().unwrap().clone().unwrap();
    assert_eq!(query.namespace, "/a");
    assert!(query.propagated);
    assert_eq!(query.tags, vec!["color=blue", "@issuer=https://x"]);
    assert_eq!(query.trusted_issuer.as_deref(), Some("https://x"));
}

// -- policy matching --

#[tokio::test]
async fn test_wildcard_policy() {
    let store = ScriptedStore::existing().with_policies(vec![pol(&["*,*"], &[])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    let perms = perms.unwrap();
    assert!(perms.allows("get", "things"));
    assert!(perms.allows("delete", "anything"));
}

#[tokio::test]
async fn test_policies_union() {
    let store = ScriptedStore::existing().with_policies(vec![
        pol(&["things,delete"], &[]),
        pol(&["things,get"], &[]),
    ]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    let perms = perms.unwrap();
    assert!(perms.allows("get", "things"));
    assert!(perms.allows("delete", "things"));
}

#[tokio::test]
async fn test_subject_not_matching() {
    let policy = pol(&["things,get"], &[]).with_subject(vec![vec![
        "color=blue".to_string(),
        "size=big".to_string(),
    ]]);
    let store = ScriptedStore::existing().with_policies(vec![policy]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert!(perms.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_subjects_never_match() {
    for subject in [vec![], vec![vec![]], vec![vec![String::new()]]] {
        let policy = pol(&["things,get"], &[]).with_subject(subject);
        let store = ScriptedStore::existing().with_policies(vec![policy]);
        let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
        assert!(perms.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_target_namespace_child_and_parent() {
    // Policy targets /a: visible from /a/b.
    let store = ScriptedStore::existing().with_policies(vec![pol(&["things,get"], &[])]);
    let (_, perms) = run(store, "/a/b", RetrieverOptions::new()).await;
    assert!(perms.unwrap().allows("get", "things"));

    // Policy targets /a/b: not visible from /a.
    let mut policy = pol(&["things,get"], &[]);
    policy.target_namespaces = vec!["/a/b".to_string()];
    let store = ScriptedStore::existing().with_policies(vec![policy]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert!(perms.unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_target_namespace() {
    let mut policy = pol(&["things,get"], &[]);
    policy.target_namespaces = vec!["/ab".to_string(), "/b".to_string()];
    let store = ScriptedStore::existing().with_policies(vec![policy]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert!(perms.unwrap().is_empty());
}

// -- subnets --

#[tokio::test]
async fn test_policy_subnet_matching() {
    let store = ScriptedStore::existing()
        .with_policies(vec![pol(&["things,get"], &["10.0.0.0/8", "11.0.0.0/8"])]);
    let (_, perms) = run(
        store,
        "/a",
        RetrieverOptions::new().with_source_ip("11.2.2.2:1234"),
    )
    .await;
    assert!(perms.unwrap().allows("get", "things"));
}

#[tokio::test]
async fn test_policy_subnet_not_matching() {
    let store = ScriptedStore::existing()
        .with_policies(vec![pol(&["things,get"], &["10.0.0.0/8", "11.0.0.0/8"])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new().with_source_ip("2.2.2.2")).await;
    assert!(perms.unwrap().is_empty());
}

#[tokio::test]
async fn test_policy_subnet_with_loopback() {
    let store =
        ScriptedStore::existing().with_policies(vec![pol(&["things,get"], &["127.0.0.0/8"])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new().with_source_ip("[::1]:80")).await;
    assert!(perms.unwrap().allows("get", "things"));
}

#[tokio::test]
async fn test_policy_subnet_with_invalid_ip() {
    let store = ScriptedStore::existing()
        .with_policies(vec![pol(&["things,get"], &["10.0.0.0/8", "11.0.0.0/8"])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new().with_source_ip(".2.2.2")).await;
    assert_eq!(
        perms.unwrap_err().to_string(),
        "missing or invalid origin IP '.2.2.2'"
    );
}

#[tokio::test]
async fn test_policy_subnet_without_ip() {
    let store =
        ScriptedStore::existing().with_policies(vec![pol(&["things,get"], &[".2.2.2."])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert_eq!(
        perms.unwrap_err().to_string(),
        "missing or invalid origin IP ''"
    );
}

#[tokio::test]
async fn test_policy_invalid_declared_cidr() {
    let store = ScriptedStore::existing().with_policies(vec![pol(&["things,get"], &["dawf"])]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new().with_source_ip("2.2.2.2")).await;
    assert_eq!(
        perms.unwrap_err().to_string(),
        "invalid CIDR address: dawf"
    );
}

// -- restrictions --

#[tokio::test]
async fn test_restricted_namespace_outside() {
    let store = ScriptedStore::existing().with_policies(vec![pol(&["*,*"], &[])]);
    let (store, perms) = run(
        store,
        "/a",
        RetrieverOptions::new().with_restrictions(Restrictions::new().with_namespace("/b")),
    )
    .await;

    assert!(perms.unwrap().is_empty());
    assert!(store.count_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_restricted_namespace_equal_or_parent() {
    for restricted in ["/a", "/"] {
        let store = ScriptedStore::existing().with_policies(vec![pol(&["*,*"], &[])]);
        let (_, perms) = run(
            store,
            "/a",
            RetrieverOptions::new()
                .with_restrictions(Restrictions::new().with_namespace(restricted)),
        )
        .await;
        assert!(perms.unwrap().allows("get", "things"), "{restricted}");
    }
}

#[tokio::test]
async fn test_restricted_namespace_child() {
    let store = ScriptedStore::existing().with_policies(vec![pol(&["*,*"], &[])]);
    let (_, perms) = run(
        store,
        "/a",
        RetrieverOptions::new().with_restrictions(Restrictions::new().with_namespace("/a/b")),
    )
    .await;
    assert!(perms.unwrap().is_empty());
}

#[tokio::test]
async fn test_restricted_permissions() {
    let store = ScriptedStore::existing().with_policies(vec![pol(&["*,*"], &[])]);
    let (_, perms) = run(
        store,
        "/a",
        RetrieverOptions::new().with_restrictions(Restrictions::new().with_permissions(["dog,get"])),
    )
    .await;
    let perms = perms.unwrap();
    assert!(!perms.allows("get", "things"));
    assert!(perms.allows("get", "dog"));
    assert!(!perms.allows("put", "dog"));
}

#[tokio::test]
async fn test_restricted_permissions_offloaded() {
    let store = ScriptedStore::existing().with_policies(vec![pol(&["*,*"], &[])]);
    let (_, perms) = run(
        store,
        "/a",
        RetrieverOptions::new()
            .with_restrictions(Restrictions::new().with_permissions(["dog,get"]))
            .with_offload_permissions_restrictions(true),
    )
    .await;
    assert!(perms.unwrap().allows("get", "things"));
}

#[tokio::test]
async fn test_restricted_networks() {
    let restrictions = Restrictions::new().with_networks(["10.0.0.0/8"]);

    let store = ScriptedStore::existing().with_policies(vec![pol(&["*,*"], &[])]);
    let (_, perms) = run(
        store,
        "/a",
        RetrieverOptions::new()
            .with_restrictions(restrictions.clone())
            .with_source_ip("10.0.1.1"),
    )
    .await;
    assert!(perms.unwrap().allows("get", "things"));

    let store = ScriptedStore::existing().with_policies(vec![pol(&["*,*"], &[])]);
    let (_, perms) = run(
        store,
        "/a",
        RetrieverOptions::new()
            .with_restrictions(restrictions)
            .with_source_ip("11.0.1.1"),
    )
    .await;
    assert!(perms.unwrap().is_empty());
}

// -- target ids --

#[tokio::test]
async fn test_id_scoped_policy() {
    let policy = || pol(&["things,get:xyz,abc"], &[]);

    let store = ScriptedStore::existing().with_policies(vec![policy()]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new()).await;
    assert!(!perms.unwrap().allows("get", "things"));

    let store = ScriptedStore::existing().with_policies(vec![policy()]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new().with_id("nope")).await;
    assert!(!perms.unwrap().allows("get", "things"));

    let store = ScriptedStore::existing().with_policies(vec![policy()]);
    let (_, perms) = run(store, "/a", RetrieverOptions::new().with_id("abc")).await;
    assert!(perms.unwrap().allows("get", "things"));
}

// -- cancellation --

#[tokio::test]
async fn test_cancelled_before_call() {
    let token = CancellationToken::new();
    token.cancel();

    let (store, perms) = run(
        ScriptedStore::existing(),
        "/a",
        RetrieverOptions::new().with_cancellation(token),
    )
    .await;

    assert!(matches!(perms, Err(PolicyError::Cancelled)));
    assert_eq!(store.retrieve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_call() {
    let store = Arc::new(ScriptedStore {
        stall_retrieve: true,
        ..ScriptedStore::existing()
    });
    let retriever = PolicyRetriever::new(store.clone());
    let token = CancellationToken::new();
    let options = RetrieverOptions::new().with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        token.cancel();
    });

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        retriever.permissions(&blue(), "/a", &options),
    )
    .await
    .expect("retrieval should be aborted, not hang");

    canceller.await.unwrap();
    assert!(matches!(result, Err(PolicyError::Cancelled)));
    assert_eq!(store.retrieve_calls.load(Ordering::SeqCst), 1);
}
