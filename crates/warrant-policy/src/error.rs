//! Retriever error types.
//!
//! Only failures are errors here. A principal that simply has no access
//! gets an empty permission map, never an error, so that callers cannot
//! probe for the existence of namespaces or policies.

use std::fmt;

use thiserror::Error;
use warrant_permissions::InvalidCidr;
use warrant_store::StoreError;

/// The store call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStep {
    /// Confirming the target namespace exists.
    CountNamespace,
    /// Retrieving candidate policies.
    RetrievePolicies,
}

impl fmt::Display for StoreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountNamespace => f.write_str("count namespace"),
            Self::RetrievePolicies => f.write_str("retrieve api authorizations"),
        }
    }
}

/// Errors that can occur while computing permissions.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The backing store failed.
    #[error("unable to {step}: {source}")]
    Store {
        /// Which call failed.
        step: StoreStep,
        /// The store error.
        #[source]
        source: StoreError,
    },

    /// A policy or restriction holds malformed CIDR text.
    #[error(transparent)]
    InvalidCidr(#[from] InvalidCidr),

    /// Subnets must be checked but the caller address is missing or malformed.
    #[error("missing or invalid origin IP '{0}'")]
    InvalidSourceIp(String),

    /// The caller cancelled the request.
    #[error("permission retrieval cancelled")]
    Cancelled,
}

impl PolicyError {
    pub(crate) fn store(step: StoreStep) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { step, source }
    }
}

/// Result type for retriever operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
