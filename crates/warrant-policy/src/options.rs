//! Per-call retriever options.

use tokio_util::sync::CancellationToken;
use warrant_permissions::Restrictions;

/// Options for a single [`Retriever::permissions`](crate::Retriever::permissions) call.
///
/// # Example
///
/// ```
/// use warrant_permissions::Restrictions;
/// use warrant_policy::RetrieverOptions;
///
/// let opts = RetrieverOptions::new()
///     .with_id("xyz")
///     .with_source_ip("10.1.2.3:4443")
///     .with_restrictions(Restrictions::new().with_namespace("/a"));
/// assert_eq!(opts.id, "xyz");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetrieverOptions {
    /// Identifier of the object being accessed. Id-scoped grants only apply
    /// when it matches.
    pub id: String,
    /// Caller address, `ip` or `ip:port`.
    pub source_ip: String,
    /// Restrictions carried by the caller's token.
    pub restrictions: Restrictions,
    /// Skip intersecting with the permission restriction. The caller takes
    /// responsibility for doing it, typically after transforming the map.
    pub offload_permissions_restrictions: bool,
    /// Aborts in-flight store calls when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl RetrieverOptions {
    /// Create options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target object identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the caller address.
    #[must_use]
    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = source_ip.into();
        self
    }

    /// Set the token restrictions.
    #[must_use]
    pub fn with_restrictions(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    /// Leave the permission restriction to the caller.
    #[must_use]
    pub fn with_offload_permissions_restrictions(mut self, offload: bool) -> Self {
        self.offload_permissions_restrictions = offload;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}
