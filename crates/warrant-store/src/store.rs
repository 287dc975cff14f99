//! Policy store trait and the in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::events::{DEFAULT_CHANNEL_CAPACITY, NamespaceChange};
use crate::model::{Authorization, Namespace};
use crate::query::{PolicyQuery, ReadConsistency};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Read access to namespaces and policies.
///
/// This is everything the retriever needs from persistence. Implementations
/// are shared across concurrent requests.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Count namespace records named exactly `name`.
    async fn count_namespaces(&self, name: &str, consistency: ReadConsistency)
    -> StoreResult<usize>;

    /// Retrieve the candidate policies for `query`.
    ///
    /// See [`PolicyQuery::matches`] for the expected result set.
    async fn retrieve_policies(&self, query: &PolicyQuery) -> StoreResult<Vec<Authorization>>;
}

#[async_trait]
impl<T: PolicyStore + ?Sized> PolicyStore for std::sync::Arc<T> {
    async fn count_namespaces(
        &self,
        name: &str,
        consistency: ReadConsistency,
    ) -> StoreResult<usize> {
        (**self).count_namespaces(name, consistency).await
    }

    async fn retrieve_policies(&self, query: &PolicyQuery) -> StoreResult<Vec<Authorization>> {
        (**self).retrieve_policies(query).await
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory policy store for tests and embedded use.
///
/// Reads are always strongly consistent. Every write publishes a
/// [`NamespaceChange`] to subscribers.
#[derive(Debug)]
pub struct MemoryPolicyStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
    policies: RwLock<Vec<Authorization>>,
    next_id: AtomicU64,
    events: broadcast::Sender<NamespaceChange>,
}

impl Default for MemoryPolicyStore {
    fn default() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            namespaces: RwLock::default(),
            policies: RwLock::default(),
            next_id: AtomicU64::new(1),
            events,
        }
    }
}

impl MemoryPolicyStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NamespaceChange> {
        self.events.subscribe()
    }

    fn publish(&self, change: NamespaceChange) {
        if let Ok(count) = self.events.send(change) {
            trace!(receivers = count, "Change published");
        }
    }

    /// Create or replace a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRecord`] if the name does not start with `/`.
    pub fn insert_namespace(&self, namespace: Namespace) -> StoreResult<()> {
        if !namespace.name.starts_with('/') {
            return Err(StoreError::InvalidRecord {
                field: "name",
                message: format!("'{}' must start with /", namespace.name),
            });
        }

        let name = namespace.name.clone();
        self.namespaces
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .insert(name.clone(), namespace);

        debug!(namespace = %name, "Namespace stored");
        self.publish(NamespaceChange::namespace(name));
        Ok(())
    }

    /// Delete a namespace. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the lock is poisoned.
    pub fn remove_namespace(&self, name: &str) -> StoreResult<bool> {
        let existed = self
            .namespaces
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .remove(name)
            .is_some();

        if existed {
            self.publish(NamespaceChange::namespace(name));
        }
        Ok(existed)
    }

    /// Validate and store a policy, returning its identifier.
    ///
    /// A policy without an id is assigned one; a policy whose id already
    /// exists replaces the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRecord`] if the policy fails
    /// [`Authorization::validate`].
    pub fn insert_policy(&self, mut policy: Authorization) -> StoreResult<String> {
        policy.validate()?;
        policy.refresh_flattened_subject();

        if policy.id.is_empty() {
            policy.id = format!("policy-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        }

        let id = policy.id.clone();
        let namespace = policy.namespace.clone();

        {
            let mut policies = self
                .policies
                .write()
                .map_err(|e| StoreError::Internal(e.to_string()))?;

            match policies.iter_mut().find(|p| p.id == id) {
                Some(existing) => *existing = policy,
                None => policies.push(policy),
            }
        }

        debug!(id = %id, namespace = %namespace, "Policy stored");
        self.publish(NamespaceChange::authorization(namespace));
        Ok(id)
    }

    /// Delete a policy. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the lock is poisoned.
    pub fn remove_policy(&self, id: &str) -> StoreResult<bool> {
        let removed = {
            let mut policies = self
                .policies
                .write()
                .map_err(|e| StoreError::Internal(e.to_string()))?;
            policies
                .iter()
                .position(|p| p.id == id)
                .map(|index| policies.remove(index))
        };

        match removed {
            Some(policy) => {
                self.publish(NamespaceChange::authorization(policy.namespace));
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Snapshot of every stored policy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the lock is poisoned.
    pub fn policies(&self) -> StoreResult<Vec<Authorization>> {
        Ok(self
            .policies
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .clone())
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn count_namespaces(
        &self,
        name: &str,
        consistency: ReadConsistency,
    ) -> StoreResult<usize> {
        let namespaces = self
            .namespaces
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let count = usize::from(namespaces.contains_key(name));
        trace!(namespace = %name, ?consistency, count, "Counted namespaces");
        Ok(count)
    }

    async fn retrieve_policies(&self, query: &PolicyQuery) -> StoreResult<Vec<Authorization>> {
        let policies = self
            .policies
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(policies
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }
}
