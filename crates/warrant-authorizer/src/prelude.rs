//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_authorizer::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuthorizerError, AuthorizerResult};

// Decisions
pub use crate::{AuthorizationRequest, Authorizer, AuthorizerBuilder, CheckOptions};

// Operations
pub use crate::{Operation, OperationTransformer};

// Cache
pub use crate::NamespacedCache;
