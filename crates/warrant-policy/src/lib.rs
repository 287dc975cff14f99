//! Warrant Policy - turns claims and a namespace into a permission map.
//!
//! [`PolicyRetriever`] is the store-backed [`Retriever`]. For each call it:
//!
//! 1. Rejects namespaces outside the token's namespace restriction
//! 2. Confirms the namespace exists (eventual read, then a strong read)
//! 3. Retrieves candidate policies sharing a tag with the claims
//! 4. Keeps policies whose subject, target namespaces and subnets match
//! 5. Unions their permissions
//! 6. Narrows the result by the token's permission and network restrictions
//!
//! Every "not authorized" outcome is an empty map. Errors are reserved for
//! store failures, malformed network data and cancellation.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use warrant_policy::prelude::*;
//! use warrant_store::{Authorization, MemoryPolicyStore, Namespace};
//!
//! # tokio_test_block(async {
//! let store = Arc::new(MemoryPolicyStore::new());
//! store.insert_namespace(Namespace::new("/a")).unwrap();
//! store
//!     .insert_policy(
//!         Authorization::new(
//!             "/a",
//!             vec![vec!["color=blue".to_string()]],
//!             vec!["/a".to_string()],
//!             ["things,get"],
//!         )
//!         .with_name("blue"),
//!     )
//!     .unwrap();
//!
//! let retriever = PolicyRetriever::new(store);
//! let perms = retriever
//!     .permissions(&["color=blue".to_string()], "/a", &RetrieverOptions::new())
//!     .await
//!     .unwrap();
//! assert!(perms.allows("get", "things"));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod matcher;
pub mod prelude;

mod error;
mod options;
mod retriever;

pub use error::{PolicyError, PolicyResult, StoreStep};
pub use options::RetrieverOptions;
pub use retriever::{PolicyRetriever, Retriever};
pub use warrant_permissions::namespace;
