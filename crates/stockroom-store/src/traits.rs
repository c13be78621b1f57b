//! Store trait: the abstract interface for persistence.
//!
//! This trait keeps the facade storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use std::collections::HashMap;

use async_trait::async_trait;
use stockroom_core::{
    EntityKind, Hierarchy, NodeId, PermissionSchema, PermissionSet, StructuralNode, UserId,
};
use stockroom_perms::{GroupTree, User};

use crate::error::Result;

/// Result of inserting a structural element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Element was inserted.
    Inserted,
    /// An element with this id already exists (idempotent, not an error).
    AlreadyExists,
}

/// Principal owning a permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionOwner {
    User(UserId),
    Group(NodeId),
}

impl PermissionOwner {
    /// Discriminator stored alongside the owner id.
    pub const fn kind(&self) -> &'static str {
        match self {
            PermissionOwner::User(_) => "user",
            PermissionOwner::Group(_) => "group",
        }
    }

    pub const fn id(&self) -> u64 {
        match self {
            PermissionOwner::User(id) => id.0,
            PermissionOwner::Group(id) => id.0,
        }
    }
}

/// The Store trait: async interface for persistence.
///
/// # Design Notes
///
/// - **Opaque permission columns**: permission sets are stored as one integer
///   per `(owner, category)`; values round-trip bit for bit.
/// - **Groups are separate**: groups live in their own table with their own
///   id sequence, elements never contain `EntityKind::Group`.
/// - **No validation**: the store persists what it is given; hierarchy
///   invariants are checked when loading through [`StoreExt`].
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Structural elements
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new element.
    async fn insert_element(&self, node: &StructuralNode) -> Result<InsertResult>;

    /// Update name, comment and parent of an existing element.
    async fn update_element(&self, node: &StructuralNode) -> Result<()>;

    /// Delete an element. Returns false if it did not exist.
    async fn delete_element(&self, id: NodeId) -> Result<bool>;

    /// List elements, optionally of one kind, in id order.
    async fn list_elements(&self, kind: Option<EntityKind>) -> Result<Vec<StructuralNode>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Groups
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a group and its permissions.
    async fn save_group(&self, node: &StructuralNode, permissions: &PermissionSet) -> Result<()>;

    /// Delete a group and its permissions. Returns false if it did not exist.
    async fn delete_group(&self, id: NodeId) -> Result<bool>;

    /// All groups with their permissions, in id order.
    async fn load_groups(&self) -> Result<Vec<(StructuralNode, PermissionSet)>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a user and its permissions.
    async fn save_user(&self, user: &User) -> Result<()>;

    async fn load_user(&self, id: UserId) -> Result<Option<User>>;

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>>;

    /// All users in id order.
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn delete_user(&self, id: UserId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the stored permission set of `owner`.
    async fn save_permissions(&self, owner: PermissionOwner, set: &PermissionSet) -> Result<()>;

    /// Stored permission set of `owner`, `None` if nothing was stored.
    async fn load_permissions(&self, owner: PermissionOwner) -> Result<Option<PermissionSet>>;
}

/// Extension trait with loading helpers.
pub trait StoreExt: Store {
    /// Rebuild the element hierarchy, validating parent links.
    fn load_hierarchy(&self) -> impl std::future::Future<Output = Result<Hierarchy>> + Send;

    /// Rebuild the group tree, filling in categories the schema gained since
    /// the groups were saved.
    fn load_group_tree(
        &self,
        schema: &PermissionSchema,
    ) -> impl std::future::Future<Output = Result<GroupTree>> + Send;

    /// All users with their permission sets brought up to the schema.
    fn load_users(
        &self,
        schema: &PermissionSchema,
    ) -> impl std::future::Future<Output = Result<Vec<User>>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn load_hierarchy(&self) -> Result<Hierarchy> {
        let nodes = self.list_elements(None).await?;
        Ok(Hierarchy::from_nodes(nodes)?)
    }

    async fn load_group_tree(&self, schema: &PermissionSchema) -> Result<GroupTree> {
        let groups = self.load_groups().await?;
        let mut nodes = Vec::with_capacity(groups.len());
        let mut permissions = HashMap::with_capacity(groups.len());
        for (node, set) in groups {
            permissions.insert(node.id, set);
            nodes.push(node);
        }
        let mut tree = GroupTree::from_parts(nodes, permissions)?;
        tree.extend_from_schema(schema);
        Ok(tree)
    }

    async fn load_users(&self, schema: &PermissionSchema) -> Result<Vec<User>> {
        let mut users = self.list_users().await?;
        for user in &mut users {
            user.permissions.extend_from_schema(schema);
        }
        Ok(users)
    }
}
