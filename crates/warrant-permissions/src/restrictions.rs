//! Restrictions - the narrowing envelope embedded in delegated tokens.
//!
//! A token derived from another token may carry a [`Restrictions`] value
//! limiting the namespace it can act in, the permissions it can exercise
//! and the networks it can be used from. Each dimension is optional; an
//! empty dimension is unrestricted.
//!
//! Re-issuing a token narrows field by field. A derived value is always a
//! subset of the original along every non-empty dimension, so the property
//! holds transitively across any chain of re-derivations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RestrictionError, RestrictionResult};
use crate::map::{PermissionMap, grant_ids};
use crate::namespace;
use crate::network::{is_subnet_of, parse_cidr, parse_cidrs};

/// Name of the claim holding the restrictions inside a token.
const RESTRICTIONS_CLAIM: &str = "restrictions";

/// Limits applied on top of whatever policies grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    /// Namespace the bearer is confined to (and its children).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Permission grants, in the same encoding as policy permissions.
    #[serde(default, rename = "perms", skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    /// CIDR blocks the bearer may connect from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
}

impl Restrictions {
    /// Create an unrestricted value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace restriction.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the permission restriction.
    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the network restriction.
    #[must_use]
    pub fn with_networks<I, S>(mut self, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.networks = networks.into_iter().map(Into::into).collect();
        self
    }

    /// Whether no dimension is restricted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespace.is_empty() && self.permissions.is_empty() && self.networks.is_empty()
    }

    /// Compute the namespace restriction of a derived token.
    ///
    /// The requested namespace must be empty (keep the original), equal to
    /// the original, or one of its children.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::NamespaceNotNarrowed`] for siblings,
    /// ancestors and unrelated namespaces.
    pub fn narrow_namespace(&self, requested: &str) -> RestrictionResult<String> {
        if self.namespace.is_empty() {
            return Ok(requested.to_string());
        }

        if requested.is_empty() || requested == self.namespace {
            return Ok(self.namespace.clone());
        }

        if namespace::is_child_of(requested, &self.namespace) {
            return Ok(requested.to_string());
        }

        Err(RestrictionError::NamespaceNotNarrowed {
            original: self.namespace.clone(),
            requested: requested.to_string(),
        })
    }

    /// Compute the network restriction of a derived token.
    ///
    /// Every requested block must lie entirely inside at least one original
    /// block. Overlapping is not enough.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::InvalidCidr`] if either list holds
    /// malformed CIDR text, or [`RestrictionError::NetworkNotNarrowed`] for
    /// the first requested block not contained in any original block.
    pub fn narrow_networks<S: AsRef<str>>(&self, requested: &[S]) -> RestrictionResult<Vec<String>> {
        if requested.is_empty() {
            return Ok(self.networks.clone());
        }

        let requested: Vec<String> = requested.iter().map(|s| s.as_ref().to_string()).collect();

        if self.networks.is_empty() {
            return Ok(requested);
        }

        let original = parse_cidrs(&self.networks)?;

        for text in &requested {
            let block = parse_cidr(text)?;
            if !original.iter().any(|outer| is_subnet_of(&block, outer)) {
                return Err(RestrictionError::NetworkNotNarrowed {
                    requested: text.clone(),
                });
            }
        }

        Ok(requested)
    }

    /// Compute the permission restriction of a derived token.
    ///
    /// Grants that apply to any object are compared with both sides parsed
    /// without a target id. Every id-scoped requested grant is then checked
    /// against what the original allows for each of its ids.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::PermissionsNotNarrowed`] if the requested
    /// grants are not contained in the original ones.
    pub fn narrow_permissions<S: AsRef<str>>(
        &self,
        requested: &[S],
    ) -> RestrictionResult<Vec<String>> {
        if requested.is_empty() {
            return Ok(self.permissions.clone());
        }

        let requested: Vec<String> = requested.iter().map(|s| s.as_ref().to_string()).collect();

        if self.permissions.is_empty() {
            return Ok(requested);
        }

        let original = PermissionMap::parse(&self.permissions, "");
        if !original.contains(&PermissionMap::parse(&requested, "")) {
            return Err(RestrictionError::PermissionsNotNarrowed);
        }

        for grant in &requested {
            for id in grant_ids(grant) {
                let allowed = PermissionMap::parse(&self.permissions, id);
                if !allowed.contains(&PermissionMap::parse(&[grant], id)) {
                    return Err(RestrictionError::PermissionsNotNarrowed);
                }
            }
        }

        Ok(requested)
    }

    /// Narrow every dimension of `self` by `requested`.
    ///
    /// This is what token exchange uses to compute the restrictions of the
    /// token it is about to issue.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, checking namespace, then
    /// networks, then permissions.
    pub fn narrow(&self, requested: &Restrictions) -> RestrictionResult<Restrictions> {
        Ok(Restrictions {
            namespace: self.narrow_namespace(&requested.namespace)?,
            networks: self.narrow_networks(&requested.networks)?,
            permissions: self.narrow_permissions(&requested.permissions)?,
        })
    }

    /// Read the restrictions embedded in already-verified token claims.
    ///
    /// A missing or null `restrictions` claim means no restriction.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::InvalidClaim`] if the claim or one of its
    /// fields has an unexpected JSON type.
    pub fn from_claims(claims: &Value) -> RestrictionResult<Self> {
        let raw = match claims.get(RESTRICTIONS_CLAIM) {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(raw)) => raw,
            Some(_) => {
                return Err(RestrictionError::InvalidClaim(
                    "restrictions must be an object".to_string(),
                ));
            },
        };

        let namespace = match raw.get("namespace") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(ns)) => ns.clone(),
            Some(_) => {
                return Err(RestrictionError::InvalidClaim(
                    "restrictions.namespace must be a string".to_string(),
                ));
            },
        };

        Ok(Self {
            namespace,
            permissions: string_list(raw.get("perms"), "restrictions.perms")?,
            networks: string_list(raw.get("networks"), "restrictions.networks")?,
        })
    }

    /// Embed these restrictions into a claims object.
    ///
    /// Nothing is written when every dimension is unrestricted.
    pub fn write_claims(&self, claims: &mut serde_json::Map<String, Value>) {
        if self.is_empty() {
            claims.remove(RESTRICTIONS_CLAIM);
            return;
        }

        // Serializing a struct of strings into a Value cannot fail.
        if let Ok(value) = serde_json::to_value(self) {
            claims.insert(RESTRICTIONS_CLAIM.to_string(), value);
        }
    }
}

fn string_list(value: Option<&Value>, field: &str) -> RestrictionResult<Vec<String>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(RestrictionError::InvalidClaim(format!(
                "{field} must be a list"
            )));
        },
    };

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                RestrictionError::InvalidClaim(format!("{field} items must be strings"))
            })
        })
        .collect()
}
