//! Restriction-related error types.

use thiserror::Error;

use crate::network::InvalidCidr;

/// Errors that can occur while narrowing or extracting restrictions.
///
/// Narrowing happens while a new token is issued from an existing one, so
/// the requester is already authenticated and these messages are safe to
/// return verbatim.
#[derive(Debug, Error)]
pub enum RestrictionError {
    /// The requested namespace is not the original one or one of its children.
    #[error("the new namespace restriction must be empty, '{original}' or one of its children")]
    NamespaceNotNarrowed {
        /// The namespace carried by the original token.
        original: String,
        /// The namespace that was requested.
        requested: String,
    },

    /// A requested network is not contained in any original network.
    #[error("the new network restriction '{requested}' must be contained in one of the original ones")]
    NetworkNotNarrowed {
        /// The offending requested CIDR.
        requested: String,
    },

    /// The requested permissions would grant something the original did not.
    #[error("the new permissions restrictions must not be broader than the existing ones")]
    PermissionsNotNarrowed,

    /// A network restriction is not valid CIDR text.
    #[error(transparent)]
    InvalidCidr(#[from] InvalidCidr),

    /// The `restrictions` claim of a token has an unexpected shape.
    #[error("invalid restrictions claim: {0}")]
    InvalidClaim(String),
}

/// Result type for restriction operations.
pub type RestrictionResult<T> = Result<T, RestrictionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_cidr_is_transparent() {
        let err = RestrictionError::from(InvalidCidr("how-come?".to_string()));
        assert_eq!(err.to_string(), "invalid CIDR address: how-come?");
    }

    #[test]
    fn test_namespace_violation_names_original() {
        let err = RestrictionError::NamespaceNotNarrowed {
            original: "/a".to_string(),
            requested: "/b".to_string(),
        };
        assert!(err.to_string().contains("'/a'"), "got: {err}");
    }
}
