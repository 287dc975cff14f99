//! Warrant Authorizer - allow/deny decisions for API requests.
//!
//! [`Authorizer`] answers "may these claims perform this operation on this
//! resource in this namespace?". It asks a [`Retriever`](warrant_policy::Retriever)
//! for the caller's permission map, caches the map per namespace and
//! caller fingerprint, and checks the operation's action against it.
//!
//! Cached maps expire after a jittered lifetime and are flushed when the
//! store reports namespace or policy changes through
//! [`Authorizer::run_invalidation`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use warrant_authorizer::prelude::*;
//! use warrant_policy::PolicyRetriever;
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
//! let authorizer = Authorizer::builder(Arc::new(PolicyRetriever::new(store))).build();
//! let claims = vec!["color=blue".to_string()];
//!
//! let ok = authorizer
//!     .check_authorization(&claims, "retrieve", "/a", "things", &CheckOptions::new())
//!     .await
//!     .unwrap();
//! assert!(ok);
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

pub mod prelude;

mod authorizer;
mod cache;
mod error;
mod operation;

pub use authorizer::{
    AuthorizationRequest, Authorizer, AuthorizerBuilder, CheckOptions, DEFAULT_CACHE_CAPACITY,
    DEFAULT_CACHE_TTL, DEFAULT_CACHE_TTL_JITTER,
};
pub use cache::NamespacedCache;
pub use error::{AuthorizerError, AuthorizerResult};
pub use operation::{MethodTransformer, Operation, OperationTransformer};
