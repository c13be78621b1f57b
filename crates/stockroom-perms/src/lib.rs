//! # Stockroom Permissions
//!
//! Users, groups and the resolution of tri-state permissions.
//!
//! ## Overview
//!
//! Every principal carries a [`PermissionSet`](stockroom_core::PermissionSet).
//! Slots set to INHERIT defer to the next principal up the chain:
//!
//! 1. the user itself
//! 2. the user's group
//! 3. that group's parent, grandparent, ...
//!
//! The first non-INHERIT value decides. An all-INHERIT chain denies.
//!
//! ## Key Types
//!
//! - [`User`] / [`Group`] - Principals
//! - [`GroupTree`] - The group hierarchy with per-group permission sets
//! - [`PermissionResolver`] - Walks the chain against the shared catalog
//! - [`Authorizer`] - Per-request seam used by menus and views
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use stockroom_core::{PermissionSchema, UserId};
//! use stockroom_perms::{GroupTree, PermissionResolver, User};
//!
//! let schema = Arc::new(PermissionSchema::builtin().unwrap());
//! let resolver = PermissionResolver::new(Arc::clone(&schema));
//!
//! let mut groups = GroupTree::new();
//! let admins = groups.add("admins", None, &schema).unwrap();
//! groups
//!     .permissions_mut(admins)
//!     .unwrap()
//!     .set_operation(&schema, "parts", "read", Some(true))
//!     .unwrap();
//!
//! let user = User::new(UserId(1), "jdoe", &schema).with_group(admins);
//! assert!(resolver.is_granted(&user, &groups, "parts", "read").unwrap());
//! assert!(!resolver.is_granted(&user, &groups, "parts", "delete").unwrap());
//! ```

pub mod authorizer;
pub mod error;
pub mod groups;
pub mod principal;
pub mod resolver;

pub use authorizer::{group_tag, user_tag, AnonymousAuthorizer, Authorizer, UserAuthorizer};
pub use error::{PermsError, Result};
pub use groups::GroupTree;
pub use principal::{Group, User};
pub use resolver::{EffectivePermission, PermissionResolver, PermissionSource};
