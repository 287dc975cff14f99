//! Permission maps - what a principal is allowed to do.
//!
//! A [`PermissionMap`] maps a resource name to a [`PermissionSet`], which
//! maps an action name to a grant. Only an explicit `true` grants; an absent
//! key means "unknown", never "denied".
//!
//! The resource name `*` and the action name `*` are wildcards. They are
//! checked explicitly wherever they appear and are never expanded into
//! concrete entries.
//!
//! # Grant encoding
//!
//! Grants are persisted as strings. Two spellings are accepted and both
//! must keep parsing identically:
//!
//! | Form | Example | Meaning |
//! |------|---------|---------|
//! | `resource:actions[:ids]` | `things:get,post:id1,id2` | colon separates fields |
//! | `resource,actions...[:ids]` | `things,get,post:id1,id2` | comma-led head, colon before ids |
//!
//! A grant carrying an `ids` clause only applies when the caller supplies a
//! matching target id. Without an id such a grant is skipped entirely.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The wildcard resource or action name.
pub const ANY: &str = "*";

/// Set of actions allowed on one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(HashMap<String, bool>);

impl PermissionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant an action.
    pub fn grant(&mut self, action: impl Into<String>) {
        self.0.insert(action.into(), true);
    }

    /// Record an action with an explicit grant value.
    pub fn set(&mut self, action: impl Into<String>, allowed: bool) {
        self.0.insert(action.into(), allowed);
    }

    /// Whether the action is explicitly granted. Wildcards are not consulted.
    #[must_use]
    pub fn is_granted(&self, action: &str) -> bool {
        self.0.get(action).copied().unwrap_or(false)
    }

    /// Whether the action is granted directly or through `*`.
    #[must_use]
    pub fn permits(&self, action: &str) -> bool {
        self.is_granted(action) || self.is_granted(ANY)
    }

    /// Whether the set grants every action.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.is_granted(ANY)
    }

    /// Iterate over granted action names.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, allowed)| **allowed)
            .map(|(action, _)| action.as_str())
    }

    /// Union another set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        for action in other.granted() {
            self.grant(action);
        }
    }

    /// Number of recorded actions (granted or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no action is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over every recorded action and its grant value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(action, allowed)| (action.as_str(), *allowed))
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for action in iter {
            set.grant(action);
        }
        set
    }
}

/// Mapping from resource name to the actions allowed on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(HashMap<String, PermissionSet>);

impl PermissionMap {
    /// Create an empty map. An empty map grants nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode persisted grant strings into a map.
    ///
    /// `target_id` is the identifier of the object being accessed, or an
    /// empty string when there is none. Grants restricted to a list of ids
    /// are kept only when `target_id` is one of them. Repeated grants for the
    /// same resource are merged.
    #[must_use]
    pub fn parse<S: AsRef<str>>(grants: &[S], target_id: &str) -> Self {
        let mut out = Self::new();

        for grant in grants {
            let Some((resource, actions)) = parse_grant(grant.as_ref(), target_id) else {
                continue;
            };

            let set = out.0.entry(resource.to_string()).or_default();
            for action in actions {
                set.grant(action);
            }
        }

        out
    }

    /// Get the set declared for a resource, without wildcard fallback.
    #[must_use]
    pub fn get(&self, resource: &str) -> Option<&PermissionSet> {
        self.0.get(resource)
    }

    /// Insert or replace the set of a resource.
    pub fn insert(&mut self, resource: impl Into<String>, set: PermissionSet) {
        self.0.insert(resource.into(), set);
    }

    /// Grant one action on one resource.
    pub fn grant(&mut self, resource: impl Into<String>, action: impl Into<String>) {
        self.0.entry(resource.into()).or_default().grant(action);
    }

    /// Union another map into this one.
    pub fn merge(&mut self, other: &PermissionMap) {
        for (resource, set) in &other.0 {
            self.0.entry(resource.clone()).or_default().merge(set);
        }
    }

    /// Whether every grant of `other` is also granted by `self`.
    ///
    /// `self["*"]` stands in for any resource `self` does not declare, and a
    /// `*` action on either the resource or on `self["*"]` stands in for any
    /// missing action. An empty `self` contains nothing, not even an empty
    /// `other`.
    #[must_use]
    pub fn contains(&self, other: &PermissionMap) -> bool {
        if self.is_empty() {
            return false;
        }

        let star = self.0.get(ANY);
        let star_declared = star.is_some_and(|s| !s.is_empty());

        for (resource, requested) in &other.0 {
            let own = self.0.get(resource);

            if own.is_none() && !star_declared {
                return false;
            }

            for action in requested.granted() {
                let granted = own.is_some_and(|s| s.permits(action))
                    || star.is_some_and(|s| s.permits(action));
                if !granted {
                    return false;
                }
            }
        }

        true
    }

    /// Narrow `self` by `restriction`.
    ///
    /// The result only holds resources both sides know about and, for each,
    /// only actions both sides allow:
    /// - a resource named only by `restriction` is checked against `self["*"]`
    /// - a resource named only by `self` is checked against `restriction["*"]`
    /// - `restriction["*"]` always adds to what `restriction` allows on a resource
    /// - a `*` action on `self`'s side takes whatever `restriction` allows
    ///
    /// Either side being empty yields an empty map.
    #[must_use]
    pub fn intersect(&self, restriction: &PermissionMap) -> PermissionMap {
        let mut out = PermissionMap::new();

        if self.is_empty() || restriction.is_empty() {
            return out;
        }

        let base_star = self.0.get(ANY);
        let restriction_star = restriction.0.get(ANY);

        let resources = self
            .0
            .keys()
            .chain(restriction.0.keys().filter(|k| !self.0.contains_key(*k)));

        for resource in resources {
            let Some(base) = self.0.get(resource).or(base_star) else {
                continue;
            };

            let own = restriction.0.get(resource);
            if own.is_none() && restriction_star.is_none() {
                continue;
            }

            let mut allowed = own.cloned().unwrap_or_default();
            if let Some(star) = restriction_star {
                allowed.merge(star);
            }

            let narrowed = if base.is_wildcard() {
                allowed
            } else {
                base.granted()
                    .filter(|action| allowed.permits(action))
                    .collect()
            };

            out.0.insert(resource.clone(), narrowed);
        }

        out
    }

    /// Whether `action` is allowed on `resource`, directly or through `*`.
    #[must_use]
    pub fn allows(&self, action: &str, resource: &str) -> bool {
        self.0.get(ANY).is_some_and(|s| s.permits(action))
            || self.0.get(resource).is_some_and(|s| s.permits(action))
    }

    /// Number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no resource is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over resources and their sets.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PermissionSet)> {
        self.0.iter().map(|(resource, set)| (resource.as_str(), set))
    }

    /// Iterate over declared resource names.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, PermissionSet)> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = (K, PermissionSet)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (resource, set) in iter {
            map.0.entry(resource.into()).or_default().merge(&set);
        }
        map
    }
}

impl IntoIterator for PermissionMap {
    type Item = (String, PermissionSet);
    type IntoIter = std::collections::hash_map::IntoIter<String, PermissionSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Object ids a grant is scoped to.
///
/// Empty for blank grants and for grants that apply to any object.
#[must_use]
pub fn grant_ids(grant: &str) -> Vec<&str> {
    split_grant(grant)
        .and_then(|(_, _, ids)| ids)
        .map(|ids| {
            ids.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Split one grant into its resource and actions, applying the id filter.
///
/// Returns `None` when the grant is blank or does not apply to `target_id`.
fn parse_grant<'a>(grant: &'a str, target_id: &str) -> Option<(&'a str, Vec<&'a str>)> {
    let (resource, actions, ids) = split_grant(grant)?;

    if let Some(ids) = ids.filter(|ids| !ids.trim().is_empty()) {
        if target_id.is_empty() || !ids.split(',').any(|id| id.trim() == target_id) {
            return None;
        }
    }

    let actions = actions
        .into_iter()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();

    Some((resource, actions))
}

/// Split one grant into resource, raw actions and the raw id list.
fn split_grant(grant: &str) -> Option<(&str, Vec<&str>, Option<&str>)> {
    let grant = grant.trim();
    if grant.is_empty() {
        return None;
    }

    let (head, rest) = match grant.split_once(':') {
        Some((head, rest)) => (head, Some(rest)),
        None => (grant, None),
    };

    let (resource, actions, ids) = if head.contains(',') {
        let mut parts = head.split(',');
        let resource = parts.next().unwrap_or_default();
        (resource, parts.collect::<Vec<_>>(), rest)
    } else {
        let (actions, ids) = match rest {
            Some(rest) => match rest.split_once(':') {
                Some((actions, ids)) => (actions, Some(ids)),
                None => (rest, None),
            },
            None => ("", None),
        };
        (head, actions.split(',').collect(), ids)
    };

    let resource = resource.trim();
    if resource.is_empty() {
        return None;
    }

    Some((resource, actions, ids))
}
