//! # Stockroom Store
//!
//! Persistence for structural elements, groups, users and their permission
//! sets, with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The facade only talks to the [`Store`] trait. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for tests.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`StoreExt`] - Rebuilds [`Hierarchy`](stockroom_core::Hierarchy) and
//!   [`GroupTree`](stockroom_perms::GroupTree) from stored rows
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`PermissionOwner`] - User or group owning a permission set
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stockroom_core::{EntityKind, NodeId, StructuralNode};
//! use stockroom_store::{SqliteStore, Store, StoreExt};
//!
//! async fn example() {
//!     let store = SqliteStore::open("stockroom.db").unwrap();
//!
//!     let shelf = StructuralNode::new(NodeId(1), EntityKind::Storelocation, "Shelf");
//!     store.insert_element(&shelf).await.unwrap();
//!
//!     let hierarchy = store.load_hierarchy().await.unwrap();
//!     assert!(hierarchy.contains(NodeId(1)));
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Bit-exact permissions**: every category is one `INTEGER` column value;
//!   reserved bit pairs survive a round trip
//! - **Idempotent inserts**: inserting an existing element returns `AlreadyExists`
//! - **Upserts**: groups and users are saved together with their permissions
//!   in one transaction

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, PermissionOwner, Store, StoreExt};
