//! Shared fixtures for integration tests.

use std::sync::Arc;

use warrant_policy::PolicyRetriever;
use warrant_store::{Authorization, MemoryPolicyStore, Namespace};

/// A memory store seeded with a small namespace tree:
///
/// ```text
/// /
/// └── /acme
///     ├── /acme/dev
///     └── /acme/prod
/// ```
#[allow(dead_code)]
pub struct Fixture {
    /// The seeded store.
    pub store: Arc<MemoryPolicyStore>,
    /// A retriever reading from `store`.
    pub retriever: Arc<PolicyRetriever>,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryPolicyStore::new());
        for ns in ["/acme", "/acme/dev", "/acme/prod"] {
            store
                .insert_namespace(Namespace::new(ns))
                .expect("failed to seed namespace");
        }

        let retriever = Arc::new(PolicyRetriever::new(Arc::clone(&store) as _));
        Self { store, retriever }
    }

    /// Store a policy granting `permissions` to the holders of `tag`,
    /// owned by and targeting `namespace`.
    pub fn grant(&self, namespace: &str, tag: &str, permissions: &[&str]) -> String {
        self.insert(
            Authorization::new(
                namespace,
                vec![vec![tag.to_string()]],
                vec![namespace.to_string()],
                permissions.iter().copied(),
            )
            .with_name(format!("{tag} in {namespace}")),
        )
    }

    pub fn insert(&self, policy: Authorization) -> String {
        self.store
            .insert_policy(policy)
            .expect("failed to seed policy")
    }
}

pub fn claims(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}
