//! API operations and the action names they are checked against.

use std::fmt;
use std::str::FromStr;

use crate::error::AuthorizerError;

/// An API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create an object.
    Create,
    /// Delete an object.
    Delete,
    /// Replace an object.
    Update,
    /// Partially update an object.
    Patch,
    /// Read one object.
    Retrieve,
    /// List objects.
    RetrieveMany,
    /// Read object metadata.
    Info,
}

impl Operation {
    /// The HTTP method grants use for this operation.
    #[must_use]
    pub fn method(self) -> &'static str {
        match self {
            Self::Create => "post",
            Self::Delete => "delete",
            Self::Update | Self::Patch => "put",
            Self::Retrieve | Self::RetrieveMany | Self::Info => "get",
        }
    }

    /// The operation's wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Patch => "patch",
            Self::Retrieve => "retrieve",
            Self::RetrieveMany => "retrieve-many",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = AuthorizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "update" => Ok(Self::Update),
            "patch" => Ok(Self::Patch),
            "retrieve" => Ok(Self::Retrieve),
            "retrieve-many" => Ok(Self::RetrieveMany),
            "info" => Ok(Self::Info),
            other => Err(AuthorizerError::UnsupportedOperation(other.to_string())),
        }
    }
}

/// Maps an operation to the action name checked against a permission map.
pub trait OperationTransformer: Send + Sync {
    /// The action name for `operation`.
    fn transform(&self, operation: Operation) -> String;
}

/// The default mapping: operations become HTTP methods.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodTransformer;

impl OperationTransformer for MethodTransformer {
    fn transform(&self, operation: Operation) -> String {
        operation.method().to_string()
    }
}
