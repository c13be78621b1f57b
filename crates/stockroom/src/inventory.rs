//! The Inventory: unified API for Stockroom.
//!
//! The Inventory keeps the structural elements, the group tree and the users
//! in memory, writes every mutation through to the store and serves the
//! permission-filtered menus from a shared cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stockroom_core::{
    CoreError, DeletePolicy, EntityKind, Hierarchy, NodeId, PermissionSchema, PermissionSet,
    StructuralNode, UserId,
};
use stockroom_format::{MoneyFormatter, UrlGenerator};
use stockroom_menu::{
    kind_tag, EntityTreeBuilder, Labels, ToolsTreeBuilder, TreeCache, TreeCacheStats, TreeMode,
    TreeViewNode, TAG_GROUPS,
};
use stockroom_perms::{
    group_tag, user_tag, AnonymousAuthorizer, EffectivePermission, GroupTree, PermissionResolver,
    PermsError, User, UserAuthorizer,
};
use stockroom_store::{PermissionOwner, Store, StoreExt};

use crate::config::InventoryConfig;
use crate::error::{InventoryError, Result};

/// Separator of [`Inventory::element_path`].
pub const PATH_DELIMITER: &str = " → ";

/// Version tag written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to rebuild an inventory, as written by
/// [`Inventory::export_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub elements: Vec<StructuralNode>,
    pub groups: Vec<SnapshotGroup>,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotGroup {
    pub node: StructuralNode,
    pub permissions: PermissionSet,
}

/// The main Inventory struct.
///
/// Provides a unified API for:
/// - Managing structural elements (categories, footprints, storelocations, ...)
/// - Managing groups, users and their permissions
/// - Building the navigation menus
/// - Backing up and restoring the whole state
pub struct Inventory<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    config: InventoryConfig,
    schema: Arc<PermissionSchema>,
    resolver: PermissionResolver,
    elements: Hierarchy,
    groups: GroupTree,
    users: BTreeMap<UserId, User>,
    cache: TreeCache,
    tools: ToolsTreeBuilder,
    entities: EntityTreeBuilder,
    money: MoneyFormatter,
}

impl<S: Store> Inventory<S> {
    /// Open an inventory over `store`, loading the catalog and every
    /// persisted element, group and user.
    pub async fn open(store: S, config: InventoryConfig) -> Result<Self> {
        let schema = Arc::new(config.permissions.load()?);
        let elements = store.load_hierarchy().await?;
        if let Some(node) = elements.iter().find(|n| n.kind == EntityKind::Group) {
            return Err(InventoryError::InvalidOperation(format!(
                "element {} is a group",
                node.id
            )));
        }
        let groups = store.load_group_tree(&schema).await?;

        let mut users = BTreeMap::new();
        for user in store.load_users(&schema).await? {
            if let Some(group) = user.group.filter(|g| !groups.contains(*g)) {
                tracing::warn!(user = %user.id, %group, "user references a missing group");
            }
            users.insert(user.id, user);
        }

        let urls = UrlGenerator::new(config.locale_prefix.clone());
        let inventory = Self {
            resolver: PermissionResolver::new(Arc::clone(&schema)),
            cache: TreeCache::new(config.menu_cache_capacity)?,
            tools: ToolsTreeBuilder::new(Labels::english(), urls.clone()),
            entities: EntityTreeBuilder::new(Labels::english(), urls),
            money: MoneyFormatter::new(config.base_currency.clone()),
            store: Arc::new(store),
            config,
            schema,
            elements,
            groups,
            users,
        };

        tracing::info!(
            elements = inventory.elements.len(),
            groups = inventory.groups.len(),
            users = inventory.users.len(),
            "inventory opened"
        );
        Ok(inventory)
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn schema(&self) -> &Arc<PermissionSchema> {
        &self.schema
    }

    pub fn money(&self) -> &MoneyFormatter {
        &self.money
    }

    pub fn cache_stats(&self) -> TreeCacheStats {
        self.cache.stats()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structural Elements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn elements(&self) -> &Hierarchy {
        &self.elements
    }

    pub fn element(&self, id: NodeId) -> Option<&StructuralNode> {
        self.elements.get(id)
    }

    /// Create an element, below `parent` if given. The parent must be of
    /// the same kind.
    pub async fn create_element(
        &mut self,
        kind: EntityKind,
        name: &str,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        if kind == EntityKind::Group {
            return Err(InventoryError::InvalidOperation(
                "groups are created with create_group".to_string(),
            ));
        }
        let id = match parent {
            Some(parent) => self.elements.insert_under(kind, name, parent)?,
            None => self.elements.insert(kind, name),
        };
        let node = self.element_node(id)?.clone();

        if let Err(e) = self.store.insert_element(&node).await {
            self.elements.remove(id, DeletePolicy::Cascade)?;
            return Err(e.into());
        }

        self.cache.invalidate_tags(&[kind_tag(kind).as_str()]);
        tracing::info!(%id, %kind, name, "element created");
        Ok(id)
    }

    /// Move an element below `new_parent`, or make it a root with `None`.
    pub async fn move_element(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<()> {
        let old_parent = self.element_node(id)?.parent;
        self.elements.set_parent(id, new_parent)?;

        let node = self.element_node(id)?.clone();
        if let Err(e) = self.store.update_element(&node).await {
            self.elements.set_parent(id, old_parent)?;
            return Err(e.into());
        }

        self.cache.invalidate_tags(&[kind_tag(node.kind).as_str()]);
        tracing::info!(%id, parent = ?new_parent, "element moved");
        Ok(())
    }

    pub async fn rename_element(&mut self, id: NodeId, name: &str) -> Result<()> {
        let mut node = self.element_node(id)?.clone();
        node.name = name.to_string();
        self.store.update_element(&node).await?;

        self.elements.rename(id, name)?;
        self.cache.invalidate_tags(&[kind_tag(node.kind).as_str()]);
        tracing::info!(%id, name, "element renamed");
        Ok(())
    }

    pub async fn set_element_comment(&mut self, id: NodeId, comment: &str) -> Result<()> {
        let mut node = self.element_node(id)?.clone();
        node.comment = comment.to_string();
        self.store.update_element(&node).await?;
        self.elements.set_comment(id, comment)?;
        Ok(())
    }

    /// Delete an element under the configured [`DeletePolicy`].
    ///
    /// Returns the ids that were removed.
    pub async fn delete_element(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let kind = self.element_node(id)?.kind;
        let mut next = self.elements.clone();
        let removed = next.remove(id, self.config.delete_policy)?;

        // Reattached children first, so a failed delete leaves no orphans.
        let moved: Vec<NodeId> = self.elements.children(id).filter(|c| next.contains(*c)).collect();
        for child in moved {
            if let Some(node) = next.get(child) {
                self.store.update_element(node).await?;
            }
        }
        for gone in removed.iter().rev() {
            self.store.delete_element(*gone).await?;
        }

        self.elements = next;
        self.cache.invalidate_tags(&[kind_tag(kind).as_str()]);
        tracing::info!(%id, removed = removed.len(), policy = ?self.config.delete_policy, "element deleted");
        Ok(removed)
    }

    /// Names from the root down to `id`, joined by [`PATH_DELIMITER`].
    pub fn element_path(&self, id: NodeId) -> Result<String> {
        Ok(self.elements.full_path(id, PATH_DELIMITER)?)
    }

    /// The tree of one kind, from the menu cache.
    ///
    /// [`EntityKind::Group`] renders the group hierarchy.
    pub fn element_tree(&self, kind: EntityKind, mode: TreeMode) -> Result<Vec<TreeViewNode>> {
        let hierarchy = match kind {
            EntityKind::Group => self.groups.hierarchy(),
            _ => &self.elements,
        };
        Ok(self.entities.cached_tree(&self.cache, hierarchy, kind, mode)?)
    }

    fn element_node(&self, id: NodeId) -> Result<&StructuralNode> {
        self.elements
            .get(id)
            .ok_or_else(|| CoreError::NodeNotFound(id).into())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Groups
    // ─────────────────────────────────────────────────────────────────────────

    pub fn groups(&self) -> &GroupTree {
        &self.groups
    }

    /// Create a group with every permission on INHERIT.
    pub async fn create_group(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId> {
        let id = self.groups.add(name, parent, &self.schema)?;
        if let Err(e) = self.persist_group(id).await {
            self.groups.remove(id, DeletePolicy::Cascade)?;
            return Err(e);
        }

        self.invalidate_groups(&[]);
        tracing::info!(%id, name, "group created");
        Ok(id)
    }

    pub async fn rename_group(&mut self, id: NodeId, name: &str) -> Result<()> {
        let old = self.group_node(id)?.name.clone();
        self.groups.rename(id, name)?;
        if let Err(e) = self.persist_group(id).await {
            self.groups.rename(id, old)?;
            return Err(e);
        }
        self.invalidate_groups(&[]);
        tracing::info!(%id, name, "group renamed");
        Ok(())
    }

    /// Move a group below `new_parent`. Members inherit from the new chain.
    pub async fn move_group(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<()> {
        let old_parent = self.group_node(id)?.parent;
        self.groups.set_parent(id, new_parent)?;
        if let Err(e) = self.persist_group(id).await {
            self.groups.set_parent(id, old_parent)?;
            return Err(e);
        }
        self.invalidate_groups(&[id]);
        tracing::info!(%id, parent = ?new_parent, "group moved");
        Ok(())
    }

    /// Delete a group under the configured policy.
    ///
    /// Members of every removed group move to the deleted group's parent.
    pub async fn delete_group(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let parent = self.group_node(id)?.parent;
        let mut next = self.groups.clone();
        let removed = next.remove(id, self.config.delete_policy)?;

        let moved: Vec<NodeId> = self
            .groups
            .hierarchy()
            .children(id)
            .filter(|c| next.contains(*c))
            .collect();
        for child in moved {
            if let (Some(group), Ok(set)) = (next.hierarchy().get(child), next.permissions(child)) {
                self.store.save_group(group, set).await?;
            }
        }

        let members: Vec<User> = self
            .users
            .values()
            .filter(|u| u.group.is_some_and(|g| removed.contains(&g)))
            .map(|u| User {
                group: parent,
                ..u.clone()
            })
            .collect();
        for member in &members {
            self.store.save_user(member).await?;
        }

        for gone in removed.iter().rev() {
            self.store.delete_group(*gone).await?;
        }

        let moved_members = members.len();
        self.groups = next;
        self.users.extend(members.into_iter().map(|u| (u.id, u)));
        self.invalidate_groups(&removed);
        tracing::info!(%id, removed = removed.len(), members = moved_members, "group deleted");
        Ok(removed)
    }

    async fn persist_group(&self, id: NodeId) -> Result<()> {
        let node = self.group_node(id)?;
        let set = self.groups.permissions(id)?;
        self.store.save_group(node, set).await?;
        Ok(())
    }

    fn group_node(&self, id: NodeId) -> Result<&StructuralNode> {
        self.groups
            .hierarchy()
            .get(id)
            .ok_or_else(|| PermsError::GroupNotFound(id).into())
    }

    fn invalidate_groups(&self, ids: &[NodeId]) {
        let mut tags = vec![TAG_GROUPS.to_string(), kind_tag(EntityKind::Group)];
        tags.extend(ids.iter().map(|id| group_tag(*id)));
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        self.cache.invalidate_tags(&tags);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users.values().find(|u| u.name == name)
    }

    /// All users in id order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Create a user with every permission on INHERIT.
    pub async fn create_user(&mut self, name: &str, group: Option<NodeId>) -> Result<UserId> {
        if self.user_by_name(name).is_some() {
            return Err(InventoryError::UserExists(name.to_string()));
        }
        if let Some(group) = group {
            self.group_node(group)?;
        }

        let id = UserId(self.users.keys().next_back().map_or(1, |last| last.0 + 1));
        let mut user = User::new(id, name, &self.schema);
        user.group = group;
        self.store.save_user(&user).await?;
        self.users.insert(id, user);

        tracing::info!(%id, name, group = ?group, "user created");
        Ok(id)
    }

    /// Change a user's group, or remove it from any group with `None`.
    pub async fn set_user_group(&mut self, id: UserId, group: Option<NodeId>) -> Result<()> {
        if let Some(group) = group {
            self.group_node(group)?;
        }
        let mut user = self.require_user(id)?.clone();
        user.group = group;
        self.store.save_user(&user).await?;
        self.users.insert(id, user);

        self.cache.invalidate_tags(&[user_tag(id).as_str()]);
        tracing::info!(%id, group = ?group, "user group changed");
        Ok(())
    }

    pub async fn delete_user(&mut self, id: UserId) -> Result<()> {
        self.require_user(id)?;
        self.store.delete_user(id).await?;
        self.users.remove(&id);
        self.cache.invalidate_tags(&[user_tag(id).as_str()]);
        tracing::info!(%id, "user deleted");
        Ok(())
    }

    fn require_user(&self, id: UserId) -> Result<&User> {
        self.users.get(&id).ok_or(InventoryError::UserNotFound(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    /// Set one operation on a group; `None` resets it to INHERIT.
    pub async fn set_group_permission(
        &mut self,
        group: NodeId,
        permission: &str,
        operation: &str,
        value: Option<bool>,
    ) -> Result<()> {
        let mut set = self.groups.permissions(group)?.clone();
        set.set_operation(&self.schema, permission, operation, value)?;
        self.store
            .save_permissions(PermissionOwner::Group(group), &set)
            .await?;
        *self.groups.permissions_mut(group)? = set;

        self.invalidate_groups(&[group]);
        tracing::info!(%group, permission, operation, ?value, "group permission set");
        Ok(())
    }

    /// Set one operation on a user; `None` resets it to INHERIT.
    pub async fn set_user_permission(
        &mut self,
        user: UserId,
        permission: &str,
        operation: &str,
        value: Option<bool>,
    ) -> Result<()> {
        let mut set = self.require_user(user)?.permissions.clone();
        set.set_operation(&self.schema, permission, operation, value)?;
        self.store
            .save_permissions(PermissionOwner::User(user), &set)
            .await?;
        if let Some(entry) = self.users.get_mut(&user) {
            entry.permissions = set;
        }

        self.cache.invalidate_tags(&[user_tag(user).as_str()]);
        tracing::info!(%user, permission, operation, ?value, "user permission set");
        Ok(())
    }

    /// Resolved value of `permission.operation` for `user`.
    pub fn is_granted(&self, user: UserId, permission: &str, operation: &str) -> Result<bool> {
        let user = self.require_user(user)?;
        Ok(self
            .resolver
            .is_granted(user, &self.groups, permission, operation)?)
    }

    /// Every operation of the catalog resolved for `user`.
    pub fn effective_permissions(&self, user: UserId) -> Result<Vec<EffectivePermission>> {
        let user = self.require_user(user)?;
        Ok(self.resolver.effective_permissions(user, &self.groups)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Menus
    // ─────────────────────────────────────────────────────────────────────────

    /// The tools menu for `user`, or for an anonymous visitor with `None`.
    pub fn tools_menu(&self, user: Option<UserId>) -> Result<Vec<TreeViewNode>> {
        let tree = match user {
            Some(id) => {
                let user = self.require_user(id)?;
                let auth = UserAuthorizer::new(&self.resolver, &self.groups, user);
                self.tools.cached_tree(&self.cache, &auth)?
            }
            None => self.tools.cached_tree(&self.cache, &AnonymousAuthorizer)?,
        };
        Ok(tree)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    /// Encode elements, groups and users as CBOR.
    pub fn export_snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            elements: self.elements.iter().cloned().collect(),
            groups: self
                .groups
                .iter()
                .map(|g| SnapshotGroup {
                    node: g.node.clone(),
                    permissions: g.permissions.clone(),
                })
                .collect(),
            users: self.users.values().cloned().collect(),
        };

        let mut buf = Vec::new();
        ciborium::into_writer(&snapshot, &mut buf)
            .map_err(|e| InventoryError::Snapshot(e.to_string()))?;
        tracing::debug!(bytes = buf.len(), "snapshot exported");
        Ok(buf)
    }

    /// Replace the whole state with a snapshot from [`export_snapshot`].
    ///
    /// The snapshot is validated before anything is written. The store is
    /// then cleared and refilled; a store failure part way leaves it partially
    /// restored, and importing the same snapshot again repairs it.
    ///
    /// [`export_snapshot`]: Self::export_snapshot
    pub async fn import_snapshot(&mut self, bytes: &[u8]) -> Result<()> {
        let snapshot: Snapshot =
            ciborium::from_reader(bytes).map_err(|e| InventoryError::Snapshot(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(InventoryError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let (elements, groups, users) = self.validate_snapshot(&snapshot)?;

        for user in self.users.keys() {
            self.store.delete_user(*user).await?;
        }
        for group in self.groups.iter() {
            self.store.delete_group(group.id()).await?;
        }
        for node in self.elements.iter() {
            self.store.delete_element(node.id).await?;
        }

        for node in elements.iter() {
            self.store.insert_element(node).await?;
        }
        for group in groups.iter() {
            self.store.save_group(group.node, group.permissions).await?;
        }
        for user in users.values() {
            self.store.save_user(user).await?;
        }

        self.elements = elements;
        self.groups = groups;
        self.users = users;
        self.cache.clear();
        tracing::info!(
            elements = self.elements.len(),
            groups = self.groups.len(),
            users = self.users.len(),
            "snapshot imported"
        );
        Ok(())
    }

    fn validate_snapshot(
        &self,
        snapshot: &Snapshot,
    ) -> Result<(Hierarchy, GroupTree, BTreeMap<UserId, User>)> {
        if snapshot.elements.iter().any(|n| n.kind == EntityKind::Group) {
            return Err(InventoryError::Snapshot(
                "groups must not appear among the elements".to_string(),
            ));
        }
        let elements = Hierarchy::from_nodes(snapshot.elements.iter().cloned())?;

        let nodes = snapshot.groups.iter().map(|g| g.node.clone()).collect();
        let permissions = snapshot
            .groups
            .iter()
            .map(|g| (g.node.id, g.permissions.clone()))
            .collect();
        let mut groups = GroupTree::from_parts(nodes, permissions)?;
        groups.extend_from_schema(&self.schema);

        let mut users: BTreeMap<UserId, User> = BTreeMap::new();
        for user in &snapshot.users {
            if users.values().any(|u| u.name == user.name) {
                return Err(InventoryError::UserExists(user.name.clone()));
            }
            if let Some(group) = user.group.filter(|g| !groups.contains(*g)) {
                return Err(InventoryError::Snapshot(format!(
                    "user {} references missing group {}",
                    user.id, group
                )));
            }
            let mut user = user.clone();
            user.permissions.extend_from_schema(&self.schema);
            if users.insert(user.id, user).is_some() {
                return Err(InventoryError::Snapshot("duplicate user id".to_string()));
            }
        }
        Ok((elements, groups, users))
    }
}
