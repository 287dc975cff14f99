//! Change notifications published by stores.

use serde::{Deserialize, Serialize};

/// Default channel capacity for change notifications.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// What kind of record changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A namespace was created, updated or deleted.
    Namespace,
    /// An authorization policy was created, updated or deleted.
    Authorization,
}

/// A namespace whose derived authorization data is now stale.
///
/// For namespace changes `namespace` is the changed namespace itself; for
/// policy changes it is the namespace owning the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceChange {
    /// What changed.
    pub kind: ChangeKind,
    /// The affected namespace.
    pub namespace: String,
}

impl NamespaceChange {
    /// A namespace record changed.
    #[must_use]
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Namespace,
            namespace: namespace.into(),
        }
    }

    /// A policy owned by `namespace` changed.
    #[must_use]
    pub fn authorization(namespace: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Authorization,
            namespace: namespace.into(),
        }
    }
}
