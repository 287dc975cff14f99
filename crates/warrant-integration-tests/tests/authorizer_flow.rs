//! Authorizer wired to a real retriever and store: caching, change-driven
//! invalidation, role expansion from configuration and cancellation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Fixture, claims};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use warrant_authorizer::prelude::*;
use warrant_config::Config;
use warrant_policy::PolicyError;
use warrant_store::Namespace;

fn authorizer(fixture: &Fixture) -> Arc<Authorizer> {
    Arc::new(Authorizer::builder(Arc::clone(&fixture.retriever) as _).build())
}

/// Wait until the background invalidation has emptied the cache.
async fn until_flushed(authz: &Authorizer) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while authz.cached_entries() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("cache was never invalidated");
}

#[tokio::test]
async fn test_allow_and_deny() {
    let fixture = Fixture::new();
    fixture.grant("/acme", "color=blue", &["things,get"]);
    let authz = authorizer(&fixture);
    let blue = claims(&["color=blue"]);
    let opts = CheckOptions::new();

    assert!(
        authz
            .check_authorization(&blue, "retrieve", "/acme/dev", "things", &opts)
            .await
            .unwrap()
    );
    assert!(
        !authz
            .check_authorization(&blue, "delete", "/acme/dev", "things", &opts)
            .await
            .unwrap()
    );
    assert!(
        !authz
            .check_authorization(&claims(&["color=red"]), "retrieve", "/acme", "things", &opts)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_policy_removal_is_seen_after_invalidation() {
    let fixture = Fixture::new();
    let id = fixture.grant("/acme", "color=blue", &["things,get"]);
    let authz = authorizer(&fixture);
    let blue = claims(&["color=blue"]);
    let opts = CheckOptions::new();

    let receiver = fixture.store.subscribe();
    let worker = {
        let authz = Arc::clone(&authz);
        tokio::spawn(async move { authz.run_invalidation(receiver).await })
    };

    assert!(
        authz
            .check_authorization(&blue, "retrieve", "/acme/dev", "things", &opts)
            .await
            .unwrap()
    );
    assert_eq!(authz.cached_entries(), 1);

    assert!(fixture.store.remove_policy(&id).unwrap());
    until_flushed(&authz).await;

    assert!(
        !authz
            .check_authorization(&blue, "retrieve", "/acme/dev", "things", &opts)
            .await
            .unwrap()
    );

    worker.abort();
}

#[tokio::test]
async fn test_new_namespace_is_seen_after_invalidation() {
    let fixture = Fixture::new();
    fixture.grant("/acme", "color=blue", &["things,get"]);
    let authz = authorizer(&fixture);
    let blue = claims(&["color=blue"]);
    let opts = CheckOptions::new();

    let receiver = fixture.store.subscribe();
    let worker = {
        let authz = Arc::clone(&authz);
        tokio::spawn(async move { authz.run_invalidation(receiver).await })
    };

    // Unknown namespaces cache an empty map.
    assert!(
        !authz
            .check_authorization(&blue, "retrieve", "/acme/qa", "things", &opts)
            .await
            .unwrap()
    );

    fixture.store.insert_namespace(Namespace::new("/acme/qa")).unwrap();
    until_flushed(&authz).await;

    assert!(
        authz
            .check_authorization(&blue, "retrieve", "/acme/qa", "things", &opts)
            .await
            .unwrap()
    );

    worker.abort();
}

#[tokio::test]
async fn test_roles_and_ignored_resources_from_config() {
    let config = Config::from_toml_str(
        r#"
        [authorizer]
        ignored_resources = ["healthz"]
        cache_ttl_secs = 60

        [roles]
        editor = ["documents,get,post,put"]
        viewer = ["documents,get"]
        "#,
    )
    .unwrap();

    let fixture = Fixture::new();
    fixture.grant("/acme", "group=writers", &["editor"]);
    let authz = Authorizer::from_config(Arc::clone(&fixture.retriever) as _, &config);
    let writers = claims(&["group=writers"]);
    let opts = CheckOptions::new();

    assert!(
        authz
            .check_authorization(&writers, "update", "/acme", "documents", &opts)
            .await
            .unwrap()
    );
    assert!(
        !authz
            .check_authorization(&writers, "delete", "/acme", "documents", &opts)
            .await
            .unwrap()
    );
    assert!(
        authz
            .check_authorization(&claims(&[]), "delete", "/anywhere", "healthz", &opts)
            .await
            .unwrap()
    );

    // A token restricted to the viewer role only reads.
    let restricted = opts.with_restrictions(
        warrant_permissions::Restrictions::new().with_permissions(["viewer"]),
    );
    assert!(
        authz
            .check_authorization(&writers, "retrieve", "/acme", "documents", &restricted)
            .await
            .unwrap()
    );
    assert!(
        !authz
            .check_authorization(&writers, "create", "/acme", "documents", &restricted)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_request_with_token_restrictions() {
    let fixture = Fixture::new();
    fixture.grant("/acme", "color=blue", &["things,get,post"]);
    let authz = authorizer(&fixture);

    let request = AuthorizationRequest {
        claims: claims(&["color=blue"]),
        token: Some(json!({
            "sub": "alice",
            "restrictions": { "namespace": "/acme/dev", "networks": ["10.0.0.0/8"] }
        })),
        operation: "create".to_string(),
        namespace: "/acme/dev".to_string(),
        resource: "things".to_string(),
        client_ip: "10.9.9.9:5555".to_string(),
        ..AuthorizationRequest::default()
    };
    assert!(authz.authorize_request(&request).await.unwrap());

    let other_namespace = AuthorizationRequest {
        namespace: "/acme/prod".to_string(),
        ..request.clone()
    };
    assert!(!authz.authorize_request(&other_namespace).await.unwrap());

    let other_network = AuthorizationRequest {
        client_ip: "192.168.0.1".to_string(),
        ..request
    };
    assert!(!authz.authorize_request(&other_network).await.unwrap());
}

#[tokio::test]
async fn test_cancelled_check_is_an_error_and_not_cached() {
    let fixture = Fixture::new();
    fixture.grant("/acme", "color=blue", &["things,get"]);
    let authz = authorizer(&fixture);

    let token = CancellationToken::new();
    token.cancel();

    let err = authz
        .check_authorization(
            &claims(&["color=blue"]),
            "retrieve",
            "/acme",
            "things",
            &CheckOptions::new().with_cancellation(token),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthorizerError::Retriever(PolicyError::Cancelled)
    ));
    assert_eq!(authz.cached_entries(), 0);
}
