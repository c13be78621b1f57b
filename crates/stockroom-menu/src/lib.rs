//! # Stockroom Menu
//!
//! Navigation trees filtered by the current principal's permissions.
//!
//! ## Overview
//!
//! Builders ask an [`Authorizer`](stockroom_perms::Authorizer) about every
//! candidate entry and emit [`TreeViewNode`]s. Results go through a
//! [`TreeCache`] keyed by the principal's cache key; every entry is tagged so
//! that a permission or structure change can drop all trees depending on it.
//!
//! ## Key Types
//!
//! - [`ToolsTreeBuilder`] - The edit / show / system tools menu
//! - [`EntityTreeBuilder`] - Structural elements of one kind as a tree
//! - [`TreeCache`] - LRU cache with tag invalidation
//! - [`Labels`] - Entry texts by translation key
//!
//! ## Usage
//!
//! ```rust
//! use stockroom_menu::{ToolsTreeBuilder, TreeCache, TAG_GROUPS};
//! use stockroom_perms::AnonymousAuthorizer;
//!
//! let cache = TreeCache::new(64).unwrap();
//! let builder = ToolsTreeBuilder::default();
//!
//! let tree = builder.cached_tree(&cache, &AnonymousAuthorizer).unwrap();
//! assert_eq!(tree.len(), 3);
//!
//! // A group changed: every tools tree is stale.
//! cache.invalidate_tags(&[TAG_GROUPS]);
//! assert!(cache.is_empty());
//! ```

pub mod cache;
pub mod entity;
pub mod error;
pub mod labels;
pub mod node;
pub mod tools;

pub use cache::{TreeCache, TreeCacheStats, TAG_GROUPS, TAG_TREE_TOOLS};
pub use entity::{kind_tag, EntityTreeBuilder, TreeMode};
pub use error::{MenuError, Result};
pub use labels::Labels;
pub use node::{to_json, TreeViewNode};
pub use tools::ToolsTreeBuilder;
