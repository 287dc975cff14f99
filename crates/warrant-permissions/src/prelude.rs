//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_permissions::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use warrant_permissions::prelude::*;
//!
//! let perms = PermissionMap::parse(&["things,get"], "");
//! assert!(perms.allows("get", "things"));
//!
//! let restrictions = Restrictions::new().with_namespace("/a");
//! assert!(restrictions.narrow_namespace("/a/b").is_ok());
//! ```

// Errors
pub use crate::{InvalidCidr, RestrictionError, RestrictionResult};

// Permission algebra
pub use crate::{ANY, PermissionMap, PermissionSet};

// Restrictions
pub use crate::Restrictions;

// Transformation
pub use crate::{RoleTransformer, Transformer};
