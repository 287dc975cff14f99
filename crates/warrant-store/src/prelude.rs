//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_store::prelude::*;` to import all essential types.

// Errors
pub use crate::{StoreError, StoreResult};

// Records
pub use crate::{Authorization, Namespace};

// Queries
pub use crate::{PolicyQuery, ReadConsistency};

// Stores
pub use crate::{MemoryPolicyStore, PolicyStore};

// Notifications
pub use crate::{ChangeKind, NamespaceChange};
