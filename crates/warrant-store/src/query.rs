//! Store queries.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use warrant_permissions::namespace;

use crate::model::Authorization;

/// Claim prefix carrying the issuer of the principal's token.
pub const ISSUER_PREFIX: &str = "@issuer=";

/// Read consistency requested from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadConsistency {
    /// Whatever the closest replica has. Cheap, possibly stale.
    #[default]
    Eventual,
    /// Read-your-writes. Used to confirm a negative eventual read.
    Strong,
}

/// Candidate policy lookup for a set of claims.
///
/// Stores return the enabled policies visible from `namespace` whose
/// flattened subject shares at least one tag with `tags`, optionally limited
/// to a trusted issuer. [`PolicyQuery::matches`] is the reference
/// evaluation; a backend translating the query into its own filter language
/// must return the same set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyQuery {
    /// Namespace the policies are retrieved for.
    pub namespace: String,
    /// Also return propagating policies owned by ancestors of `namespace`.
    pub propagated: bool,
    /// Deduplicated claim tags, in first-seen order.
    pub tags: Vec<String>,
    /// Issuer the policy must trust, taken from an `@issuer=` claim.
    pub trusted_issuer: Option<String>,
}

impl PolicyQuery {
    /// Build the candidate query for `claims` in `namespace`.
    ///
    /// When several `@issuer=` claims are present, the last one wins.
    #[must_use]
    pub fn for_claims<S: AsRef<str>>(namespace: impl Into<String>, claims: &[S]) -> Self {
        let mut seen = HashSet::new();
        let mut tags = Vec::with_capacity(claims.len());
        let mut trusted_issuer = None;

        for claim in claims {
            let claim = claim.as_ref();
            if !seen.insert(claim) {
                continue;
            }
            tags.push(claim.to_string());
            if let Some(issuer) = claim.strip_prefix(ISSUER_PREFIX) {
                trusted_issuer = Some(issuer.to_string());
            }
        }

        Self {
            namespace: namespace.into(),
            propagated: true,
            tags,
            trusted_issuer: trusted_issuer.filter(|i| !i.is_empty()),
        }
    }

    /// Whether `policy` is visible from the query namespace.
    #[must_use]
    pub fn in_scope(&self, policy: &Authorization) -> bool {
        policy.namespace == self.namespace
            || (self.propagated
                && policy.propagate
                && namespace::is_parent_of(&policy.namespace, &self.namespace))
    }

    /// Whether `policy` belongs in the result of this query.
    #[must_use]
    pub fn matches(&self, policy: &Authorization) -> bool {
        if policy.disabled || !self.in_scope(policy) {
            return false;
        }

        if !policy
            .flattened_subject
            .iter()
            .any(|tag| self.tags.contains(tag))
        {
            return false;
        }

        match &self.trusted_issuer {
            Some(issuer) => policy.trusted_issuers.contains(issuer),
            None => true,
        }
    }
}
