//! # Stockroom
//!
//! Structural elements, tri-state permissions and navigation menus for a
//! parts inventory.
//!
//! ## Overview
//!
//! An [`Inventory`] owns the in-memory model and writes every change
//! through to a [`Store`]:
//!
//! - **Elements** - categories, footprints, storelocations and the other
//!   structural kinds, each forming its own tree
//! - **Principals** - users and a hierarchy of groups, each with a
//!   bit-packed permission set
//! - **Menus** - the tools menu and element trees, filtered by permission
//!   and cached until a mutation invalidates them
//!
//! ## Key Concepts
//!
//! ### Tri-state permissions
//!
//! Every operation of a permission category is ALLOW, DISALLOW or INHERIT.
//! INHERIT defers to the user's group, then that group's ancestors; the
//! nearest explicit value wins and an all-INHERIT chain denies.
//!
//! ### Delete policy
//!
//! Deleting an element or group either moves its children up to its parent
//! (the default) or removes the whole subtree, see [`DeletePolicy`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stockroom::{EntityKind, Inventory, InventoryConfig, MemoryStore};
//!
//! # async fn example() -> stockroom::Result<()> {
//! let mut inventory = Inventory::open(MemoryStore::new(), InventoryConfig::default()).await?;
//!
//! let passives = inventory.create_element(EntityKind::Category, "Passives", None).await?;
//! inventory.create_element(EntityKind::Category, "Resistors", Some(passives)).await?;
//!
//! let editors = inventory.create_group("editors", None).await?;
//! inventory.set_group_permission(editors, "parts", "create", Some(true)).await?;
//! let alice = inventory.create_user("alice", Some(editors)).await?;
//!
//! assert!(inventory.is_granted(alice, "parts", "create")?);
//! let menu = inventory.tools_menu(Some(alice))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod inventory;

// Re-export component crates
pub use stockroom_core as core;
pub use stockroom_format as format;
pub use stockroom_menu as menu;
pub use stockroom_perms as perms;
pub use stockroom_store as store;

// Re-export main types
pub use config::{InventoryConfig, SchemaSource};
pub use error::{InventoryError, Result};
pub use inventory::{Inventory, Snapshot, SnapshotGroup, PATH_DELIMITER, SNAPSHOT_VERSION};

pub use stockroom_core::{
    BitValue, DeletePolicy, EntityKind, Hierarchy, NodeId, PermissionSchema, PermissionSet,
    StructuralNode, UserId,
};
pub use stockroom_menu::{TreeMode, TreeViewNode};
pub use stockroom_perms::{Authorizer, GroupTree, User};
pub use stockroom_store::{MemoryStore, SqliteStore, Store};
