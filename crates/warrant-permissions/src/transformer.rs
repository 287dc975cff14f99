//! Permission transformers.
//!
//! A transformer rewrites the permission map computed by the retriever
//! before restrictions are applied. The stock [`RoleTransformer`] expands
//! role names into the grants they stand for.

use std::collections::HashMap;

use tracing::trace;

use crate::map::PermissionMap;

/// Rewrites a permission map.
pub trait Transformer: Send + Sync {
    /// Return the transformed map.
    fn transform(&self, permissions: PermissionMap) -> PermissionMap;
}

/// Expands role resources into the grants they stand for.
///
/// A resource key naming a configured role, such as a bare `editor` grant,
/// is replaced by the grants configured for that role. Unknown names pass
/// through untouched.
#[derive(Debug, Clone, Default)]
pub struct RoleTransformer {
    roles: HashMap<String, PermissionMap>,
}

impl RoleTransformer {
    /// Create a transformer from role names mapped to grant strings.
    #[must_use]
    pub fn new(roles: HashMap<String, Vec<String>>) -> Self {
        let roles = roles
            .into_iter()
            .map(|(role, grants)| {
                let map = PermissionMap::parse(&grants, "");
                (role, map)
            })
            .collect();

        Self { roles }
    }

    /// Number of configured roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether no role is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl Transformer for RoleTransformer {
    fn transform(&self, permissions: PermissionMap) -> PermissionMap {
        if self.roles.is_empty() {
            return permissions;
        }

        let mut out = PermissionMap::new();

        for (resource, set) in permissions {
            if let Some(expanded) = self.roles.get(&resource) {
                trace!(role = %resource, "Expanding role");
                out.merge(expanded);
                continue;
            }

            let mut single = PermissionMap::new();
            single.insert(resource, set);
            out.merge(&single);
        }

        out
    }
}

impl<T: Transformer + ?Sized> Transformer for std::sync::Arc<T> {
    fn transform(&self, permissions: PermissionMap) -> PermissionMap {
        (**self).transform(permissions)
    }
}
