//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_policy::prelude::*;` to import all essential types.

// Errors
pub use crate::{PolicyError, PolicyResult};

// Retrieval
pub use crate::{PolicyRetriever, Retriever, RetrieverOptions};
