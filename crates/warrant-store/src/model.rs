//! Stored records: authorization policies and namespaces.

use serde::{Deserialize, Serialize};
use warrant_permissions::network::parse_cidr;

use crate::error::{StoreError, StoreResult};

/// Maximum size of a single subject tag, in bytes.
pub const MAX_TAG_BYTES: usize = 1024;

fn default_propagate() -> bool {
    true
}

/// An authorization policy.
///
/// A policy grants `permissions` in `target_namespaces` (and their
/// children) to any principal whose claims satisfy `subject`. The subject is
/// an OR of AND-groups: the policy applies when at least one group is fully
/// contained in the principal's claims.
///
/// `flattened_subject` is the deduplicated union of every tag in `subject`.
/// Stores index it for candidate lookup, so every constructor and setter in
/// this type keeps it in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Store identifier.
    #[serde(default, rename = "ID", skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Namespace owning the policy.
    #[serde(default)]
    pub namespace: String,
    /// Whether child namespaces of `namespace` see the policy.
    #[serde(default = "default_propagate")]
    pub propagate: bool,
    /// Disabled policies are never returned to the retriever.
    #[serde(default)]
    pub disabled: bool,
    /// OR of AND-groups of claim tags.
    #[serde(default)]
    pub subject: Vec<Vec<String>>,
    /// Deduplicated union of the tags in `subject`.
    #[serde(default)]
    pub flattened_subject: Vec<String>,
    /// Namespaces the permissions apply to.
    #[serde(default)]
    pub target_namespaces: Vec<String>,
    /// Granted permissions, in the persisted grant encoding.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Source networks the policy is limited to. Empty means anywhere.
    #[serde(default)]
    pub subnets: Vec<String>,
    /// Issuers whose tokens the policy accepts. Empty means any issuer.
    #[serde(default)]
    pub trusted_issuers: Vec<String>,
}

impl Authorization {
    /// Create an enabled, propagating policy owned by `namespace`.
    #[must_use]
    pub fn new<P: Into<String>>(
        namespace: impl Into<String>,
        subject: Vec<Vec<String>>,
        target_namespaces: Vec<String>,
        permissions: impl IntoIterator<Item = P>,
    ) -> Self {
        let flattened_subject = flatten_subject(&subject);
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            namespace: namespace.into(),
            propagate: true,
            disabled: false,
            subject,
            flattened_subject,
            target_namespaces,
            permissions: permissions.into_iter().map(Into::into).collect(),
            subnets: Vec::new(),
            trusted_issuers: Vec::new(),
        }
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the subject, recomputing the flattened subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Vec<Vec<String>>) -> Self {
        self.flattened_subject = flatten_subject(&subject);
        self.subject = subject;
        self
    }

    /// Limit the policy to source networks.
    #[must_use]
    pub fn with_subnets<S: Into<String>>(mut self, subnets: impl IntoIterator<Item = S>) -> Self {
        self.subnets = subnets.into_iter().map(Into::into).collect();
        self
    }

    /// Limit the policy to tokens from the given issuers.
    #[must_use]
    pub fn with_trusted_issuers<S: Into<String>>(
        mut self,
        issuers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.trusted_issuers = issuers.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether child namespaces see the policy.
    #[must_use]
    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    /// Set the disabled flag.
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Recompute `flattened_subject` after `subject` was edited in place.
    pub fn refresh_flattened_subject(&mut self) {
        self.flattened_subject = flatten_subject(&self.subject);
    }

    /// Validate the record before it is written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRecord`] when:
    /// - the name or the permissions are missing
    /// - a subject tag is not `key=value` with a non-empty key and value
    /// - a subject tag is [`MAX_TAG_BYTES`] or longer
    /// - a subnet is not valid CIDR text
    /// - a target namespace does not start with `/`
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", "attribute is required"));
        }

        if self.permissions.is_empty() {
            return Err(invalid("permissions", "attribute is required"));
        }

        for (line, group) in self.subject.iter().enumerate() {
            for tag in group {
                validate_subject_tag(tag, line.saturating_add(1))?;
            }
        }

        for subnet in &self.subnets {
            parse_cidr(subnet).map_err(|e| invalid("subnets", e.to_string()))?;
        }

        for target in &self.target_namespaces {
            if !target.starts_with('/') {
                return Err(invalid(
                    "targetNamespaces",
                    format!("'{target}' must start with /"),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> StoreError {
    StoreError::InvalidRecord {
        field,
        message: message.into(),
    }
}

fn validate_subject_tag(tag: &str, line: usize) -> StoreResult<()> {
    if tag.len() >= MAX_TAG_BYTES {
        return Err(invalid(
            "subject",
            format!("'{tag}' must be less than {MAX_TAG_BYTES} bytes"),
        ));
    }

    let Some((key, value)) = tag.split_once('=') else {
        return Err(invalid(
            "subject",
            format!("subject claim '{tag}' on line {line} is an invalid tag"),
        ));
    };

    if key.is_empty() || key.contains(' ') {
        return Err(invalid(
            "subject",
            format!("subject claim '{tag}' on line {line} has an invalid key"),
        ));
    }

    if value.is_empty() {
        return Err(invalid(
            "subject",
            format!("subject claim '{tag}' on line {line} has no value"),
        ));
    }

    Ok(())
}

/// Compute the deduplicated union of every tag in a subject expression.
///
/// The first occurrence of each tag keeps its position.
#[must_use]
pub fn flatten_subject(subject: &[Vec<String>]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    subject
        .iter()
        .flatten()
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}

/// A namespace record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Full slash-delimited path.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Namespace {
    /// Create a namespace record.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}
