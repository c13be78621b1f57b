//! In-memory implementation of the Store trait.
//!
//! Same semantics as SQLite, nothing is persisted.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use stockroom_core::{EntityKind, NodeId, PermissionSet, StructuralNode, UserId};
use stockroom_perms::User;

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, PermissionOwner, Store};

/// In-memory store. All data is lost when the store is dropped.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    elements: BTreeMap<NodeId, StructuralNode>,
    groups: BTreeMap<NodeId, StructuralNode>,
    /// Users without their permissions, which live in `permissions`.
    users: BTreeMap<UserId, User>,
    permissions: BTreeMap<PermissionOwner, PermissionSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl MemoryStoreInner {
    fn user_with_permissions(&self, user: &User) -> User {
        let mut user = user.clone();
        user.permissions = self
            .permissions
            .get(&PermissionOwner::User(user.id))
            .cloned()
            .unwrap_or_default();
        user
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_element(&self, node: &StructuralNode) -> Result<InsertResult> {
        if node.kind == EntityKind::Group {
            return Err(StoreError::InvalidData(format!(
                "{} is a group, use save_group",
                node.id
            )));
        }
        let mut inner = self.write()?;
        if inner.elements.contains_key(&node.id) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.elements.insert(node.id, node.clone());
        Ok(InsertResult::Inserted)
    }

    async fn update_element(&self, node: &StructuralNode) -> Result<()> {
        let mut inner = self.write()?;
        match inner.elements.get_mut(&node.id) {
            Some(stored) if stored.kind == node.kind => {
                *stored = node.clone();
                Ok(())
            }
            Some(stored) => Err(StoreError::InvalidData(format!(
                "{} is a {}, not a {}",
                node.id, stored.kind, node.kind
            ))),
            None => Err(StoreError::NotFound(format!("element {}", node.id))),
        }
    }

    async fn delete_element(&self, id: NodeId) -> Result<bool> {
        Ok(self.write()?.elements.remove(&id).is_some())
    }

    async fn list_elements(&self, kind: Option<EntityKind>) -> Result<Vec<StructuralNode>> {
        let inner = self.read()?;
        Ok(inner
            .elements
            .values()
            .filter(|n| kind.map_or(true, |k| n.kind == k))
            .cloned()
            .collect())
    }

    async fn save_group(&self, node: &StructuralNode, permissions: &PermissionSet) -> Result<()> {
        if node.kind != EntityKind::Group {
            return Err(StoreError::InvalidData(format!(
                "{} is a {}, not a group",
                node.id, node.kind
            )));
        }
        let mut inner = self.write()?;
        inner.groups.insert(node.id, node.clone());
        inner
            .permissions
            .insert(PermissionOwner::Group(node.id), permissions.clone());
        Ok(())
    }

    async fn delete_group(&self, id: NodeId) -> Result<bool> {
        let mut inner = self.write()?;
        inner.permissions.remove(&PermissionOwner::Group(id));
        Ok(inner.groups.remove(&id).is_some())
    }

    async fn load_groups(&self) -> Result<Vec<(StructuralNode, PermissionSet)>> {
        let inner = self.read()?;
        Ok(inner
            .groups
            .values()
            .map(|node| {
                let set = inner
                    .permissions
                    .get(&PermissionOwner::Group(node.id))
                    .cloned()
                    .unwrap_or_default();
                (node.clone(), set)
            })
            .collect())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(other) = inner
            .users
            .values()
            .find(|u| u.name == user.name && u.id != user.id)
        {
            return Err(StoreError::InvalidData(format!(
                "user name {:?} is taken by {}",
                user.name, other.id
            )));
        }
        let mut stored = user.clone();
        stored.permissions = PermissionSet::default();
        inner.users.insert(user.id, stored);
        inner
            .permissions
            .insert(PermissionOwner::User(user.id), user.permissions.clone());
        Ok(())
    }

    async fn load_user(&self, id: UserId) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner.users.get(&id).map(|u| inner.user_with_permissions(u)))
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .values()
            .find(|u| u.name == name)
            .map(|u| inner.user_with_permissions(u)))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .values()
            .map(|u| inner.user_with_permissions(u))
            .collect())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut inner = self.write()?;
        inner.permissions.remove(&PermissionOwner::User(id));
        Ok(inner.users.remove(&id).is_some())
    }

    async fn save_permissions(&self, owner: PermissionOwner, set: &PermissionSet) -> Result<()> {
        self.write()?.permissions.insert(owner, set.clone());
        Ok(())
    }

    async fn load_permissions(&self, owner: PermissionOwner) -> Result<Option<PermissionSet>> {
        Ok(self.read()?.permissions.get(&owner).cloned())
    }
}
