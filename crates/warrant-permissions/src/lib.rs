//! Warrant Permissions - the permission algebra behind every authorization decision.
//!
//! This crate provides:
//! - [`PermissionMap`] / [`PermissionSet`]: resource → action → grant mappings
//!   with `*` wildcards on both levels
//! - Parsing of the persisted `resource:actions[:ids]` grant encoding
//! - Containment, intersection and `allows` checks
//! - [`Restrictions`]: the narrowing envelope carried inside delegated tokens
//! - Namespace hierarchy and CIDR helpers shared by the retriever
//!
//! Nothing in this crate performs I/O. Everything is a pure function over
//! its inputs, except where CIDR text must be parsed, in which case the
//! parse error is returned to the caller.
//!
//! # Example
//!
//! ```
//! use warrant_permissions::{PermissionMap, Restrictions};
//!
//! let granted = PermissionMap::parse(&["things:get,post", "*:get"], "");
//! assert!(granted.allows("post", "things"));
//! assert!(granted.allows("get", "anything"));
//! assert!(!granted.allows("delete", "things"));
//!
//! // A delegated token may only ever narrow what it carries.
//! let original = Restrictions::new().with_permissions(["things,get,post"]);
//! let narrowed = original
//!     .narrow(&Restrictions::new().with_permissions(["things,get"]))
//!     .unwrap();
//! assert_eq!(narrowed.permissions, vec!["things,get".to_string()]);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod namespace;
pub mod network;
pub mod prelude;

mod error;
mod map;
mod restrictions;
mod transformer;

pub use error::{RestrictionError, RestrictionResult};
pub use map::{ANY, PermissionMap, PermissionSet, grant_ids};
pub use network::InvalidCidr;
pub use restrictions::Restrictions;
pub use transformer::{RoleTransformer, Transformer};
