//! The group hierarchy.
//!
//! Groups are structural elements of kind [`EntityKind::Group`]; a group
//! inherits every INHERIT slot from its parent group.

use std::collections::HashMap;

use stockroom_core::{
    DeletePolicy, EntityKind, Hierarchy, NodeId, PermissionSchema, PermissionSet, StructuralNode,
};

use crate::error::{PermsError, Result};
use crate::principal::Group;

/// Groups and their permission sets.
#[derive(Debug, Clone, Default)]
pub struct GroupTree {
    hierarchy: Hierarchy,
    permissions: HashMap<NodeId, PermissionSet>,
}

impl GroupTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted groups. Every node must be a group and every
    /// group must come with its permission set.
    pub fn from_parts(
        nodes: Vec<StructuralNode>,
        mut permissions: HashMap<NodeId, PermissionSet>,
    ) -> Result<Self> {
        if let Some(node) = nodes.iter().find(|n| n.kind != EntityKind::Group) {
            return Err(PermsError::InvalidGroup(format!(
                "{} is a {}, not a group",
                node.id, node.kind
            )));
        }
        for node in &nodes {
            if !permissions.contains_key(&node.id) {
                return Err(PermsError::InvalidGroup(format!(
                    "group {} has no permission set",
                    node.id
                )));
            }
        }
        let hierarchy = Hierarchy::from_nodes(nodes)?;
        permissions.retain(|id, _| hierarchy.contains(*id));
        Ok(Self {
            hierarchy,
            permissions,
        })
    }

    /// Create a group with all permissions on INHERIT.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        schema: &PermissionSchema,
    ) -> Result<NodeId> {
        self.add_with_permissions(name, parent, PermissionSet::for_schema(schema))
    }

    pub fn add_with_permissions(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        permissions: PermissionSet,
    ) -> Result<NodeId> {
        let id = match parent {
            Some(parent) => {
                self.require(parent)?;
                self.hierarchy.insert_under(EntityKind::Group, name, parent)?
            }
            None => self.hierarchy.insert(EntityKind::Group, name),
        };
        self.permissions.insert(id, permissions);
        Ok(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.permissions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<Group<'_>> {
        Some(Group {
            node: self.hierarchy.get(id)?,
            permissions: self.permissions.get(&id)?,
        })
    }

    /// All groups in id order.
    pub fn iter(&self) -> impl Iterator<Item = Group<'_>> {
        self.hierarchy.iter().filter_map(|node| {
            self.permissions
                .get(&node.id)
                .map(|permissions| Group { node, permissions })
        })
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn permissions(&self, id: NodeId) -> Result<&PermissionSet> {
        self.permissions.get(&id).ok_or(PermsError::GroupNotFound(id))
    }

    pub fn permissions_mut(&mut self, id: NodeId) -> Result<&mut PermissionSet> {
        self.permissions
            .get_mut(&id)
            .ok_or(PermsError::GroupNotFound(id))
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        Ok(self.hierarchy.rename(id, name)?)
    }

    /// Move a group; cycles are rejected.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        Ok(self.hierarchy.set_parent(id, parent)?)
    }

    pub fn remove(&mut self, id: NodeId, policy: DeletePolicy) -> Result<Vec<NodeId>> {
        let removed = self.hierarchy.remove(id, policy)?;
        for gone in &removed {
            self.permissions.remove(gone);
        }
        Ok(removed)
    }

    /// `id` followed by its ancestors, nearest first.
    pub fn chain(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.require(id)?;
        let mut chain = vec![id];
        chain.extend(self.hierarchy.ancestors(id)?.map(|n| n.id));
        Ok(chain)
    }

    /// Fill in categories added to the schema after the groups were stored.
    pub fn extend_from_schema(&mut self, schema: &PermissionSchema) {
        for set in self.permissions.values_mut() {
            set.extend_from_schema(schema);
        }
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(PermsError::GroupNotFound(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_nearest_first() {
        let schema = PermissionSchema::builtin().unwrap();
        let mut tree = GroupTree::new();
        let admins = tree.add("admins", None, &schema).unwrap();
        let staff = tree.add("staff", Some(admins), &schema).unwrap();
        let interns = tree.add("interns", Some(staff), &schema).unwrap();

        assert_eq!(tree.chain(interns).unwrap(), vec![interns, staff, admins]);
        assert_eq!(tree.chain(admins).unwrap(), vec![admins]);
        assert_eq!(tree.get(staff).unwrap().name(), "staff");
    }

    #[test]
    fn test_unknown_parent() {
        let schema = PermissionSchema::builtin().unwrap();
        let mut tree = GroupTree::new();
        assert!(matches!(
            tree.add("x", Some(NodeId(42)), &schema),
            Err(PermsError::GroupNotFound(_))
        ));
    }

    #[test]
    fn test_remove_drops_permissions() {
        let schema = PermissionSchema::builtin().unwrap();
        let mut tree = GroupTree::new();
        let admins = tree.add("admins", None, &schema).unwrap();
        let staff = tree.add("staff", Some(admins), &schema).unwrap();

        tree.remove(admins, DeletePolicy::ReassignToParent).unwrap();
        assert!(tree.permissions(admins).is_err());
        assert!(tree.hierarchy().is_root(staff).unwrap());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_from_parts_rejects_non_groups() {
        let node = StructuralNode::new(NodeId(1), EntityKind::Footprint, "TO-220");
        let mut perms = HashMap::new();
        perms.insert(NodeId(1), PermissionSet::default());
        assert!(matches!(
            GroupTree::from_parts(vec![node], perms),
            Err(PermsError::InvalidGroup(_))
        ));
    }
}
