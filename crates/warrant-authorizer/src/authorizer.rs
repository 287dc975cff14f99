//! The authorizer: allow/deny decisions backed by a cached retriever.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use warrant_config::Config;
use warrant_permissions::{PermissionMap, Restrictions, RoleTransformer, Transformer};
use warrant_policy::{Retriever, RetrieverOptions};
use warrant_store::NamespaceChange;

use crate::cache::NamespacedCache;
use crate::error::{AuthorizerError, AuthorizerResult};
use crate::operation::{MethodTransformer, Operation, OperationTransformer};

/// Default maximum number of cached permission maps.
pub const DEFAULT_CACHE_CAPACITY: usize = 24_000;

/// Default base lifetime of a cached permission map.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default upper bound of the random extra lifetime.
pub const DEFAULT_CACHE_TTL_JITTER: Duration = Duration::from_secs(1800);

// ---------------------------------------------------------------------------
// Per-check options
// ---------------------------------------------------------------------------

/// Options for a single [`Authorizer::check_authorization`] call.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Caller address, `ip` or `ip:port`.
    pub source_ip: String,
    /// Identifier of the object being accessed.
    pub id: String,
    /// Restrictions carried by the caller's token.
    pub restrictions: Restrictions,
    /// Aborts the permission lookup when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl CheckOptions {
    /// Create options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the caller address.
    #[must_use]
    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = source_ip.into();
        self
    }

    /// Set the target object identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the token restrictions.
    #[must_use]
    pub fn with_restrictions(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn retriever_options(&self) -> RetrieverOptions {
        let options = RetrieverOptions::new()
            .with_id(self.id.clone())
            .with_source_ip(self.source_ip.clone())
            .with_restrictions(self.restrictions.clone());

        match &self.cancellation {
            Some(token) => options.with_cancellation(token.clone()),
            None => options,
        }
    }
}

/// An incoming API request, after its token has been verified.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequest {
    /// Identity claims of the caller.
    pub claims: Vec<String>,
    /// The verified token's claims object, `None` when no token was sent.
    pub token: Option<serde_json::Value>,
    /// Operation name, such as `create` or `retrieve-many`.
    pub operation: String,
    /// Target namespace.
    pub namespace: String,
    /// Target resource.
    pub resource: String,
    /// Target object identifier, if any.
    pub object_id: String,
    /// Caller address.
    pub client_ip: String,
    /// Aborts the permission lookup when cancelled.
    pub cancellation: Option<CancellationToken>,
}

// ---------------------------------------------------------------------------
// Authorizer
// ---------------------------------------------------------------------------

/// Decides whether a principal may perform an operation on a resource.
///
/// Permission maps are cached per namespace and per caller fingerprint
/// (claims, source address, object id and restrictions).
pub struct Authorizer {
    retriever: Arc<dyn Retriever>,
    ignored_resources: HashSet<String>,
    cache: NamespacedCache<PermissionMap>,
    cache_ttl: Duration,
    cache_ttl_jitter: Duration,
    operation_transformer: Arc<dyn OperationTransformer>,
    permissions_transformer: Option<Arc<dyn Transformer>>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("ignored_resources", &self.ignored_resources)
            .field("cache", &self.cache)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_ttl_jitter", &self.cache_ttl_jitter)
            .field(
                "permissions_transformer",
                &self.permissions_transformer.is_some(),
            )
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    /// Start building an authorizer around `retriever`.
    #[must_use]
    pub fn builder(retriever: Arc<dyn Retriever>) -> AuthorizerBuilder {
        AuthorizerBuilder::new(retriever)
    }

    /// Build an authorizer from the `[authorizer]` and `[roles]` sections
    /// of the configuration.
    #[must_use]
    pub fn from_config(retriever: Arc<dyn Retriever>, config: &Config) -> Self {
        let section = &config.authorizer;
        let mut builder = Self::builder(retriever)
            .ignored_resources(section.ignored_resources.iter().cloned())
            .cache_capacity(section.cache_capacity)
            .cache_ttl(section.cache_ttl())
            .cache_ttl_jitter(section.cache_ttl_jitter());

        if !config.roles.is_empty() {
            builder =
                builder.permissions_transformer(Arc::new(RoleTransformer::new(config.roles.clone())));
        }

        builder.build()
    }

    /// Decide whether `claims` may perform `operation` on `resource` in
    /// `namespace`.
    ///
    /// Ignored resources are always allowed. Everything else goes through
    /// the cached permission map for the caller.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizerError::MissingNamespace`] or
    /// [`AuthorizerError::InvalidNamespace`] for a bad namespace,
    /// [`AuthorizerError::UnsupportedOperation`] for an unknown operation and
    /// [`AuthorizerError::Retriever`] if the permission lookup fails.
    pub async fn check_authorization(
        &self,
        claims: &[String],
        operation: &str,
        namespace: &str,
        resource: &str,
        options: &CheckOptions,
    ) -> AuthorizerResult<bool> {
        if self.ignored_resources.contains(resource) {
            return Ok(true);
        }

        if namespace.is_empty() {
            return Err(AuthorizerError::MissingNamespace);
        }

        if !namespace.starts_with('/') {
            return Err(AuthorizerError::InvalidNamespace(namespace.to_string()));
        }

        let action = self.operation_transformer.transform(operation.parse::<Operation>()?);
        let key = cache_key(claims, options);

        if let Some(perms) = self.cache.get(namespace, &key) {
            debug!(namespace = %namespace, resource = %resource, "Permission cache hit");
            return Ok(perms.allows(&action, resource));
        }

        let generation = self.cache.generation();
        let perms = self.retrieve(claims, namespace, options).await?;
        let allowed = perms.allows(&action, resource);
        if !self
            .cache
            .set_if_current(namespace, &key, perms, self.entry_ttl(), generation)
        {
            debug!(namespace = %namespace, "Cache invalidated during lookup, result not cached");
        }

        debug!(
            namespace = %namespace,
            resource = %resource,
            action = %action,
            allowed,
            "Authorization decided"
        );

        Ok(allowed)
    }

    /// Decide an incoming request, reading the restrictions embedded in its
    /// token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizerError::MissingToken`] when the request has no
    /// token, [`AuthorizerError::Restrictions`] when its restrictions are
    /// malformed, and otherwise the errors of
    /// [`check_authorization`](Self::check_authorization).
    pub async fn authorize_request(&self, request: &AuthorizationRequest) -> AuthorizerResult<bool> {
        if self.ignored_resources.contains(&request.resource) {
            return Ok(true);
        }

        let token = request.token.as_ref().ok_or(AuthorizerError::MissingToken)?;
        let restrictions = Restrictions::from_claims(token)?;

        let mut options = CheckOptions::new()
            .with_restrictions(restrictions)
            .with_id(request.object_id.clone())
            .with_source_ip(request.client_ip.clone());
        options.cancellation.clone_from(&request.cancellation);

        self.check_authorization(
            &request.claims,
            &request.operation,
            &request.namespace,
            &request.resource,
            &options,
        )
        .await
    }

    /// Drop cached permission maps as namespaces and policies change.
    ///
    /// Runs until the notification channel closes; drive it from a task.
    pub async fn run_invalidation(&self, receiver: broadcast::Receiver<NamespaceChange>) {
        self.cache.run_invalidation(receiver).await;
    }

    /// Drop the cached permission maps of `namespace` and its descendants.
    pub fn invalidate_namespace(&self, namespace: &str) {
        self.cache.invalidate_namespace(namespace);
    }

    /// Number of cached permission maps.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    async fn retrieve(
        &self,
        claims: &[String],
        namespace: &str,
        options: &CheckOptions,
    ) -> AuthorizerResult<PermissionMap> {
        let ropts = options.retriever_options();

        let Some(transformer) = &self.permissions_transformer else {
            return Ok(self.retriever.permissions(claims, namespace, &ropts).await?);
        };

        // Role grants in the restriction narrow by what they expand to.
        let ropts = ropts.with_offload_permissions_restrictions(true);
        let perms = transformer.transform(self.retriever.permissions(claims, namespace, &ropts).await?);

        let restricted = &options.restrictions.permissions;
        if restricted.is_empty() {
            return Ok(perms);
        }

        let restriction = transformer.transform(PermissionMap::parse(restricted, &options.id));
        Ok(perms.intersect(&restriction))
    }

    fn entry_ttl(&self) -> Duration {
        let jitter_secs = self.cache_ttl_jitter.as_secs();
        if jitter_secs == 0 {
            return self.cache_ttl;
        }

        let extra = Duration::from_secs(rand::thread_rng().gen_range(0..jitter_secs));
        self.cache_ttl.checked_add(extra).unwrap_or(self.cache_ttl)
    }
}

/// Fingerprint of everything that shapes a caller's permission map.
fn cache_key(claims: &[String], options: &CheckOptions) -> String {
    fn field<'a>(hasher: &mut blake3::Hasher, parts: impl IntoIterator<Item = &'a String>) {
        let mut count: u64 = 0;
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
            count = count.saturating_add(1);
        }
        hasher.update(&count.to_le_bytes());
    }

    let restrictions = &options.restrictions;
    let mut hasher = blake3::Hasher::new();
    field(&mut hasher, claims);
    field(&mut hasher, [&options.source_ip]);
    field(&mut hasher, [&options.id]);
    field(&mut hasher, [&restrictions.namespace]);
    field(&mut hasher, &restrictions.networks);
    field(&mut hasher, &restrictions.permissions);
    hasher.finalize().to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`Authorizer`].
pub struct AuthorizerBuilder {
    retriever: Arc<dyn Retriever>,
    ignored_resources: HashSet<String>,
    cache_capacity: usize,
    cache_ttl: Duration,
    cache_ttl_jitter: Duration,
    invalidate_on_authorization: bool,
    operation_transformer: Arc<dyn OperationTransformer>,
    permissions_transformer: Option<Arc<dyn Transformer>>,
}

impl std::fmt::Debug for AuthorizerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizerBuilder")
            .field("ignored_resources", &self.ignored_resources)
            .field("cache_capacity", &self.cache_capacity)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_ttl_jitter", &self.cache_ttl_jitter)
            .finish_non_exhaustive()
    }
}

impl AuthorizerBuilder {
    fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            retriever,
            ignored_resources: HashSet::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_ttl_jitter: DEFAULT_CACHE_TTL_JITTER,
            invalidate_on_authorization: true,
            operation_transformer: Arc::new(MethodTransformer),
            permissions_transformer: None,
        }
    }

    /// Resources that are always authorized.
    #[must_use]
    pub fn ignored_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_resources
            .extend(resources.into_iter().map(Into::into));
        self
    }

    /// Maximum number of cached permission maps.
    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Base lifetime of a cached permission map.
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Upper bound of the random extra lifetime added to each entry.
    #[must_use]
    pub fn cache_ttl_jitter(mut self, jitter: Duration) -> Self {
        self.cache_ttl_jitter = jitter;
        self
    }

    /// Whether policy changes, not only namespace changes, flush cached
    /// maps.
    #[must_use]
    pub fn invalidate_on_authorization_change(mut self, enabled: bool) -> Self {
        self.invalidate_on_authorization = enabled;
        self
    }

    /// Replace the operation to action mapping.
    #[must_use]
    pub fn operation_transformer(mut self, transformer: Arc<dyn OperationTransformer>) -> Self {
        self.operation_transformer = transformer;
        self
    }

    /// Rewrite retrieved permission maps, e.g. to expand roles.
    #[must_use]
    pub fn permissions_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.permissions_transformer = Some(transformer);
        self
    }

    /// Build the authorizer.
    #[must_use]
    pub fn build(self) -> Authorizer {
        Authorizer {
            retriever: self.retriever,
            ignored_resources: self.ignored_resources,
            cache: NamespacedCache::new(self.cache_capacity)
                .with_authorization_invalidation(self.invalidate_on_authorization),
            cache_ttl: self.cache_ttl,
            cache_ttl_jitter: self.cache_ttl_jitter,
            operation_transformer: self.operation_transformer,
            permissions_transformer: self.permissions_transformer,
        }
    }
}

#[cfg(test)]
#[path = "authorizer_tests.rs"]
mod tests;
