//! # Stockroom Core
//!
//! Pure primitives for Stockroom: bit-packed permissions, the permission
//! catalog and the structural element hierarchy.
//!
//! This crate contains no I/O apart from reading a catalog file on request.
//!
//! ## Key Types
//!
//! - [`PermissionSet`] - Tri-state permission values packed two bits per operation
//! - [`PermissionSchema`] - Category/operation catalog mapping names to bit offsets
//! - [`Hierarchy`] - Arena of parent/child structural elements
//! - [`EntityKind`] - Discriminator deciding which nodes may be related
//!
//! ## Usage
//!
//! ```rust
//! use stockroom_core::{BitValue, PermissionSchema, PermissionSet};
//!
//! let schema = PermissionSchema::builtin().unwrap();
//! let mut perms = PermissionSet::for_schema(&schema);
//!
//! perms.set_operation(&schema, "parts", "read", Some(true)).unwrap();
//! assert_eq!(perms.operation(&schema, "parts", "read").unwrap(), Some(true));
//! assert_eq!(perms.bit_value("parts", 2).unwrap(), BitValue::Inherit);
//! ```

pub mod bitfield;
pub mod error;
pub mod hierarchy;
pub mod schema;
pub mod types;

pub use bitfield::{BitValue, PermissionSet, ALL_INHERIT};
pub use error::{CoreError, Result};
pub use hierarchy::{Ancestors, DeletePolicy, Hierarchy, StructuralNode};
pub use schema::{
    Category, CategoryConfig, GroupConfig, Operation, OperationConfig, PermissionConfig,
    PermissionGroup, PermissionSchema, OTHER_GROUP,
};
pub use types::{BitOffset, EntityKind, NodeId, UserId};
