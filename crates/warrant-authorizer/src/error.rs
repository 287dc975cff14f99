//! Authorizer error types.

use thiserror::Error;
use warrant_permissions::RestrictionError;
use warrant_policy::PolicyError;

/// Errors that can occur while deciding a request.
///
/// A principal without access is not an error: the decision is simply
/// `false`.
#[derive(Debug, Error)]
pub enum AuthorizerError {
    /// The request carries no namespace.
    #[error("missing namespace")]
    MissingNamespace,

    /// The request namespace does not start with `/`.
    #[error("invalid namespace '{0}': a namespace must start with /")]
    InvalidNamespace(String),

    /// The request carries no verified token claims.
    #[error("missing token")]
    MissingToken,

    /// The operation name is not one the authorizer knows.
    #[error("unsupported operation '{0}'")]
    UnsupportedOperation(String),

    /// The token's embedded restrictions are malformed.
    #[error(transparent)]
    Restrictions(#[from] RestrictionError),

    /// Computing the permission map failed.
    #[error(transparent)]
    Retriever(#[from] PolicyError),
}

/// Result type for authorizer operations.
pub type AuthorizerResult<T> = Result<T, AuthorizerError>;
