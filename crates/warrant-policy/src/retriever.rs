//! The policy retriever.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use warrant_permissions::{PermissionMap, namespace};
use warrant_store::{PolicyQuery, PolicyStore, ReadConsistency};

use crate::error::{PolicyError, PolicyResult, StoreStep};
use crate::matcher::{source_ip_allowed, subject_matches};
use crate::options::RetrieverOptions;

/// Computes what a principal may do in a namespace.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the permissions granted to `claims` in `namespace`.
    ///
    /// A principal with no access receives an empty map, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the store fails, when a policy or
    /// restriction carries malformed CIDR text, when subnets must be checked
    /// against a missing or malformed source address, or when the request
    /// is cancelled.
    async fn permissions(
        &self,
        claims: &[String],
        namespace: &str,
        options: &RetrieverOptions,
    ) -> PolicyResult<PermissionMap>;
}

#[async_trait]
impl<T: Retriever + ?Sized> Retriever for Arc<T> {
    async fn permissions(
        &self,
        claims: &[String],
        namespace: &str,
        options: &RetrieverOptions,
    ) -> PolicyResult<PermissionMap> {
        (**self).permissions(claims, namespace, options).await
    }
}

/// Retriever backed by a [`PolicyStore`].
///
/// Holds no per-call state; one instance can serve concurrent requests.
#[derive(Clone)]
pub struct PolicyRetriever {
    store: Arc<dyn PolicyStore>,
}

impl std::fmt::Debug for PolicyRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRetriever").finish_non_exhaustive()
    }
}

impl PolicyRetriever {
    /// Create a retriever reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    /// Confirm the namespace exists.
    ///
    /// A negative eventual read is confirmed with a strong read before
    /// giving up, so that a namespace created a moment ago is not reported
    /// missing by a lagging replica.
    async fn count_namespace(
        &self,
        namespace: &str,
        cancellation: Option<&CancellationToken>,
    ) -> PolicyResult<usize> {
        let count = guarded(
            cancellation,
            self.store
                .count_namespaces(namespace, ReadConsistency::Eventual),
        )
        .await?
        .map_err(PolicyError::store(StoreStep::CountNamespace))?;

        if count != 0 {
            return Ok(count);
        }

        debug!(namespace = %namespace, "Namespace not found, retrying with strong consistency");

        guarded(
            cancellation,
            self.store
                .count_namespaces(namespace, ReadConsistency::Strong),
        )
        .await?
        .map_err(PolicyError::store(StoreStep::CountNamespace))
    }
}

#[async_trait]
impl Retriever for PolicyRetriever {
    async fn permissions(
        &self,
        claims: &[String],
        ns: &str,
        options: &RetrieverOptions,
    ) -> PolicyResult<PermissionMap> {
        let restrictions = &options.restrictions;
        let cancellation = options.cancellation.as_ref();

        if !restrictions.namespace.is_empty() && !namespace::is_within(ns, &restrictions.namespace)
        {
            warn!(
                namespace = %ns,
                restricted_to = %restrictions.namespace,
                "Namespace outside of token restriction"
            );
            return Ok(PermissionMap::new());
        }

        if ns != namespace::ROOT {
            let count = self.count_namespace(ns, cancellation).await?;
            if count != 1 {
                warn!(namespace = %ns, count, "Namespace not found");
                return Ok(PermissionMap::new());
            }
        }

        let query = PolicyQuery::for_claims(ns, claims);
        let candidates = guarded(cancellation, self.store.retrieve_policies(&query))
            .await?
            .map_err(PolicyError::store(StoreStep::RetrievePolicies))?;

        let claim_set: HashSet<&str> = claims.iter().map(String::as_str).collect();
        let mut out = PermissionMap::new();

        for policy in &candidates {
            if !subject_matches(&policy.subject, &claim_set) {
                debug!(policy = %policy.id, "Policy subject does not match claims");
                continue;
            }

            if !policy
                .target_namespaces
                .iter()
                .any(|target| namespace::is_within(ns, target))
            {
                debug!(policy = %policy.id, namespace = %ns, "Policy does not target namespace");
                continue;
            }

            if !policy.subnets.is_empty()
                && !source_ip_allowed(&options.source_ip, &policy.subnets)?
            {
                debug!(
                    policy = %policy.id,
                    source_ip = %options.source_ip,
                    "Source address outside of policy subnets"
                );
                continue;
            }

            debug!(policy = %policy.id, namespace = %ns, "Policy matched");
            out.merge(&PermissionMap::parse(&policy.permissions, &options.id));
        }

        if !restrictions.permissions.is_empty() && !options.offload_permissions_restrictions {
            out = out.intersect(&PermissionMap::parse(&restrictions.permissions, &options.id));
        }

        if !restrictions.networks.is_empty()
            && !source_ip_allowed(&options.source_ip, &restrictions.networks)?
        {
            warn!(
                source_ip = %options.source_ip,
                "Source address outside of token network restriction"
            );
            return Ok(PermissionMap::new());
        }

        Ok(out)
    }
}

/// Run a store call, aborting it if `cancellation` fires first.
async fn guarded<F: Future>(
    cancellation: Option<&CancellationToken>,
    call: F,
) -> PolicyResult<F::Output> {
    let Some(token) = cancellation else {
        return Ok(call.await);
    };

    tokio::select! {
        biased;
        () = token.cancelled() => Err(PolicyError::Cancelled),
        output = call => Ok(output),
    }
}

#[cfg(test)]
#[path = "retriever_tests.rs"]
mod tests;
