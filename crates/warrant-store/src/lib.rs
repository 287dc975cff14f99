//! Warrant Store - the persistence boundary of the policy engine.
//!
//! The retriever never talks to a database directly. It reads through the
//! [`PolicyStore`] trait, which asks for exactly two things:
//!
//! - how many namespace records carry a given name, at a requested
//!   [`ReadConsistency`]
//! - which enabled [`Authorization`] policies visible from a namespace share
//!   at least one subject tag with a principal's claims ([`PolicyQuery`])
//!
//! [`MemoryPolicyStore`] implements the trait in memory and publishes a
//! [`NamespaceChange`] on every write so that caches can be invalidated.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod events;
pub mod model;
pub mod prelude;
pub mod query;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use events::{ChangeKind, NamespaceChange};
pub use model::{Authorization, Namespace, flatten_subject};
pub use query::{ISSUER_PREFIX, PolicyQuery, ReadConsistency};
pub use store::{MemoryPolicyStore, PolicyStore};
