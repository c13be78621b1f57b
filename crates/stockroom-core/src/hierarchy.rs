//! Structural element hierarchy.
//!
//! Nodes live in an arena addressed by [`NodeId`]. A node stores only its
//! parent; the children of every node are kept in a secondary index so
//! there are no mutual references to maintain.
//!
//! Invariants:
//! - a parent always has the same [`EntityKind`] as its child
//! - no node is its own ancestor
//!
//! Both are enforced by [`Hierarchy::set_parent`], the only way to link nodes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{EntityKind, NodeId};

/// A single element of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralNode {
    pub id: NodeId,
    pub kind: EntityKind,
    pub name: String,
    #[serde(default)]
    pub comment: String,
    pub parent: Option<NodeId>,
}

impl StructuralNode {
    pub fn new(id: NodeId, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            comment: String::new(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Id string as shown in the UI, e.g. `G000014`.
    pub fn id_string(&self) -> String {
        self.kind.id_string(self.id)
    }
}

/// What happens to the children of a removed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Children move up to the removed node's parent.
    #[default]
    ReassignToParent,
    /// The whole subtree is removed.
    Cascade,
}

/// Arena of structural nodes of any kind.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: BTreeMap<NodeId, StructuralNode>,
    children: BTreeMap<NodeId, BTreeSet<NodeId>>,
    next_id: u64,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted nodes, validating every parent link.
    pub fn from_nodes(nodes: impl IntoIterator<Item = StructuralNode>) -> Result<Self> {
        let mut hierarchy = Self::new();
        let mut links = Vec::new();

        for mut node in nodes {
            if hierarchy.nodes.contains_key(&node.id) {
                return Err(CoreError::invalid(format!("duplicate node id {}", node.id)));
            }
            if let Some(parent) = node.parent.take() {
                links.push((node.id, parent));
            }
            hierarchy.next_id = hierarchy.next_id.max(node.id.0);
            hierarchy.nodes.insert(node.id, node);
        }

        for (id, parent) in links {
            hierarchy.set_parent(id, Some(parent))?;
        }

        Ok(hierarchy)
    }

    /// Create a detached node.
    pub fn insert(&mut self, kind: EntityKind, name: impl Into<String>) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, StructuralNode::new(id, kind, name));
        id
    }

    /// Create a node directly below `parent`.
    pub fn insert_under(
        &mut self,
        kind: EntityKind,
        name: impl Into<String>,
        parent: NodeId,
    ) -> Result<NodeId> {
        let parent_kind = self.node(parent)?.kind;
        if parent_kind != kind {
            return Err(CoreError::TypeMismatch {
                expected: kind,
                actual: parent_kind,
            });
        }
        let id = self.insert(kind, name);
        self.set_parent(id, Some(parent))?;
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&StructuralNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &StructuralNode> {
        self.nodes.values()
    }

    pub fn iter_kind(&self, kind: EntityKind) -> impl Iterator<Item = &StructuralNode> {
        self.nodes.values().filter(move |n| n.kind == kind)
    }

    /// Attach `id` below `parent`, or detach it with `None`.
    ///
    /// Rejects parents of another kind and parents that are `id` itself or
    /// one of its descendants.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        let kind = self.node(id)?.kind;

        if let Some(parent) = parent {
            let parent_kind = self.node(parent)?.kind;
            if parent_kind != kind {
                return Err(CoreError::TypeMismatch {
                    expected: kind,
                    actual: parent_kind,
                });
            }
            if parent == id || self.is_child_of(parent, id)? {
                return Err(CoreError::CycleDetected { node: id, parent });
            }
        }

        let old = self.node(id)?.parent;
        if old == parent {
            return Ok(());
        }
        if let Some(old) = old {
            self.unlink_child(old, id);
        }
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().insert(id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent;
        }
        Ok(())
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_comment(&mut self, id: NodeId, comment: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.comment = comment.into();
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn is_root(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.is_root())
    }

    /// True if `other` is a (transitive) ancestor of `id`.
    ///
    /// A node is never a child of itself. Comparing nodes of different kinds
    /// is an error rather than `false`.
    pub fn is_child_of(&self, id: NodeId, other: NodeId) -> Result<bool> {
        let kind = self.node(id)?.kind;
        let other_kind = self.node(other)?.kind;
        if kind != other_kind {
            return Err(CoreError::TypeMismatch {
                expected: kind,
                actual: other_kind,
            });
        }
        Ok(self.ancestors(id)?.any(|ancestor| ancestor.id == other))
    }

    /// Ancestors of `id`, nearest first. Does not include `id`.
    pub fn ancestors(&self, id: NodeId) -> Result<Ancestors<'_>> {
        let node = self.node(id)?;
        Ok(Ancestors {
            hierarchy: self,
            next: node.parent,
            remaining: self.nodes.len(),
        })
    }

    /// Depth below the root; roots are level 0.
    pub fn level(&self, id: NodeId) -> Result<usize> {
        Ok(self.ancestors(id)?.count())
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn path(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut path: Vec<NodeId> = self.ancestors(id)?.map(|n| n.id).collect();
        path.reverse();
        path.push(id);
        Ok(path)
    }

    /// Nodes from the root down to `id`, inclusive.
    pub fn path_nodes(&self, id: NodeId) -> Result<Vec<&StructuralNode>> {
        let mut path: Vec<&StructuralNode> = self.ancestors(id)?.collect();
        path.reverse();
        path.push(self.node(id)?);
        Ok(path)
    }

    /// Names from the root down to `id`, joined by `separator`.
    pub fn full_path(&self, id: NodeId, separator: &str) -> Result<String> {
        Ok(self
            .path_nodes(id)?
            .iter()
            .map(|n| n.name.as_str())
            .collect::<Vec<_>>()
            .join(separator))
    }

    /// Direct children of `id` in id order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children
            .get(&id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Every node below `id`, depth first, parents before children.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.node(id)?;
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut below: Vec<NodeId> = self.children(next).collect();
            below.reverse();
            stack.extend(below);
        }
        Ok(out)
    }

    /// Root nodes of one kind, in id order.
    pub fn roots(&self, kind: EntityKind) -> Vec<NodeId> {
        self.iter_kind(kind)
            .filter(|n| n.is_root())
            .map(|n| n.id)
            .collect()
    }

    /// Remove `id`, returning the ids that left the arena.
    pub fn remove(&mut self, id: NodeId, policy: DeletePolicy) -> Result<Vec<NodeId>> {
        let parent = self.node(id)?.parent;

        let removed = match policy {
            DeletePolicy::ReassignToParent => {
                let orphans: Vec<NodeId> = self.children(id).collect();
                for child in orphans {
                    // Same kind and strictly above the child, so this cannot fail.
                    self.set_parent(child, parent)?;
                }
                vec![id]
            }
            DeletePolicy::Cascade => {
                let mut ids = vec![id];
                ids.extend(self.descendants(id)?);
                ids
            }
        };

        if let Some(parent) = parent {
            self.unlink_child(parent, id);
        }
        for gone in &removed {
            self.nodes.remove(gone);
            self.children.remove(gone);
        }
        Ok(removed)
    }

    fn node(&self, id: NodeId) -> Result<&StructuralNode> {
        self.nodes.get(&id).ok_or(CoreError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut StructuralNode> {
        self.nodes.get_mut(&id).ok_or(CoreError::NodeNotFound(id))
    }

    fn unlink_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(set) = self.children.get_mut(&parent) {
            set.remove(&child);
            if set.is_empty() {
                self.children.remove(&parent);
            }
        }
    }
}

/// Walks the parent chain upwards. Restartable via [`Hierarchy::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    hierarchy: &'a Hierarchy,
    next: Option<NodeId>,
    // bounded by node count
    remaining: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a StructuralNode;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let node = self.hierarchy.nodes.get(&self.next?)?;
        self.next = node.parent;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Fixture {
        h: Hierarchy,
        root: NodeId,
        child1: NodeId,
        child2: NodeId,
        child3: NodeId,
        child1_1: NodeId,
        child1_2: NodeId,
    }

    fn fixture() -> Fixture {
        let mut h = Hierarchy::new();
        let kind = EntityKind::AttachmentType;
        let root = h.insert(kind, "root");
        let child1 = h.insert_under(kind, "child1", root).unwrap();
        let child2 = h.insert_under(kind, "child2", root).unwrap();
        let child3 = h.insert_under(kind, "child3", root).unwrap();
        let child1_1 = h.insert_under(kind, "child1_1", child1).unwrap();
        let child1_2 = h.insert_under(kind, "child1_2", child1).unwrap();
        Fixture {
            h,
            root,
            child1,
            child2,
            child3,
            child1_1,
            child1_2,
        }
    }

    #[test]
    fn test_is_root() {
        let f = fixture();
        assert!(f.h.is_root(f.root).unwrap());
        assert!(!f.h.is_root(f.child1).unwrap());
        assert!(!f.h.is_root(f.child1_2).unwrap());
    }

    #[test]
    fn test_is_child_of() {
        let f = fixture();
        assert!(!f.h.is_child_of(f.root, f.child1).unwrap());
        assert!(!f.h.is_child_of(f.root, f.root).unwrap());
        assert!(f.h.is_child_of(f.child1, f.root).unwrap());
        assert!(f.h.is_child_of(f.child1_2, f.child1).unwrap());
        assert!(f.h.is_child_of(f.child1_2, f.root).unwrap());
        assert!(!f.h.is_child_of(f.child1_2, f.child2).unwrap());
    }

    #[test]
    fn test_is_child_of_other_kind() {
        let mut f = fixture();
        let category = f.h.insert(EntityKind::Category, "cat");
        assert!(matches!(
            f.h.is_child_of(f.root, category),
            Err(CoreError::TypeMismatch {
                expected: EntityKind::AttachmentType,
                actual: EntityKind::Category,
            })
        ));
    }

    #[test]
    fn test_level() {
        let f = fixture();
        assert_eq!(f.h.level(f.root).unwrap(), 0);
        assert_eq!(f.h.level(f.child1).unwrap(), 1);
        assert_eq!(f.h.level(f.child2).unwrap(), 1);
        assert_eq!(f.h.level(f.child1_1).unwrap(), 2);
        assert_eq!(f.h.level(f.child1_2).unwrap(), 2);
    }

    #[test]
    fn test_full_path_and_path() {
        let f = fixture();
        assert_eq!(f.h.full_path(f.child1_1, "/").unwrap(), "root/child1/child1_1");
        assert_eq!(f.h.full_path(f.child2, "#").unwrap(), "root#child2");
        assert_eq!(f.h.path(f.child1_1).unwrap(), vec![f.root, f.child1, f.child1_1]);
        assert_eq!(f.h.path(f.child1).unwrap(), vec![f.root, f.child1]);
        assert_eq!(f.h.path(f.root).unwrap(), vec![f.root]);
    }

    #[test]
    fn test_four_level_chain() {
        let mut h = Hierarchy::new();
        let kind = EntityKind::Footprint;
        let root = h.insert(kind, "root");
        let a = h.insert_under(kind, "A", root).unwrap();
        let b = h.insert_under(kind, "B", a).unwrap();
        let c = h.insert_under(kind, "C", b).unwrap();

        assert!(h.is_child_of(c, root).unwrap());
        assert!(!h.is_child_of(root, c).unwrap());
        assert!(h.is_root(root).unwrap());
        assert_eq!(h.level(c).unwrap(), 3);
        assert_eq!(h.full_path(c, "/").unwrap(), "root/A/B/C");
        assert_eq!(h.path(c).unwrap(), vec![root, a, b, c]);

        // Restartable
        assert_eq!(h.ancestors(c).unwrap().count(), 3);
        assert_eq!(h.ancestors(c).unwrap().count(), 3);
    }

    #[test]
    fn test_reparent_updates_level() {
        let mut f = fixture();
        assert_eq!(f.h.level(f.child1_1).unwrap(), 2);
        f.h.set_parent(f.child1_1, Some(f.child3)).unwrap();
        assert_eq!(f.h.level(f.child1_1).unwrap(), 2);
        assert_eq!(f.h.full_path(f.child1_1, "/").unwrap(), "root/child3/child1_1");
        f.h.set_parent(f.child1_1, None).unwrap();
        assert_eq!(f.h.level(f.child1_1).unwrap(), 0);
        assert_eq!(f.h.children(f.child1).collect::<Vec<_>>(), vec![f.child1_2]);
    }

    #[test]
    fn test_rejects_cycles() {
        let mut f = fixture();
        assert!(matches!(
            f.h.set_parent(f.root, Some(f.child1_1)),
            Err(CoreError::CycleDetected { .. })
        ));
        assert!(matches!(
            f.h.set_parent(f.child1, Some(f.child1)),
            Err(CoreError::CycleDetected { .. })
        ));
        // Nothing changed
        assert!(f.h.is_root(f.root).unwrap());
    }

    #[test]
    fn test_rejects_cross_kind_parent() {
        let mut f = fixture();
        let group = f.h.insert(EntityKind::Group, "admins");
        assert!(matches!(
            f.h.set_parent(group, Some(f.root)),
            Err(CoreError::TypeMismatch { .. })
        ));
        assert!(f.h.insert_under(EntityKind::Group, "x", f.root).is_err());
    }

    #[test]
    fn test_remove_reassigns_children() {
        let mut f = fixture();
        let removed = f.h.remove(f.child1, DeletePolicy::ReassignToParent).unwrap();
        assert_eq!(removed, vec![f.child1]);
        assert_eq!(f.h.parent(f.child1_1).unwrap(), Some(f.root));
        assert_eq!(f.h.parent(f.child1_2).unwrap(), Some(f.root));
        assert_eq!(f.h.level(f.child1_2).unwrap(), 1);
        assert!(f.h.get(f.child1).is_none());
        assert_eq!(
            f.h.children(f.root).collect::<Vec<_>>(),
            vec![f.child2, f.child3, f.child1_1, f.child1_2]
        );
    }

    #[test]
    fn test_remove_root_reassigns_to_none() {
        let mut f = fixture();
        f.h.remove(f.root, DeletePolicy::ReassignToParent).unwrap();
        let roots = f.h.roots(EntityKind::AttachmentType);
        assert_eq!(roots, vec![f.child1, f.child2, f.child3]);
    }

    #[test]
    fn test_remove_cascade() {
        let mut f = fixture();
        let removed = f.h.remove(f.child1, DeletePolicy::Cascade).unwrap();
        assert_eq!(removed, vec![f.child1, f.child1_1, f.child1_2]);
        assert_eq!(f.h.len(), 3);
        assert_eq!(f.h.descendants(f.root).unwrap(), vec![f.child2, f.child3]);
    }

    #[test]
    fn test_descendants_order() {
        let f = fixture();
        assert_eq!(
            f.h.descendants(f.root).unwrap(),
            vec![f.child1, f.child1_1, f.child1_2, f.child2, f.child3]
        );
    }

    #[test]
    fn test_from_nodes_validates() {
        let f = fixture();
        let nodes: Vec<StructuralNode> = f.h.iter().cloned().collect();
        let rebuilt = Hierarchy::from_nodes(nodes.clone()).unwrap();
        assert_eq!(rebuilt.full_path(f.child1_2, "/").unwrap(), "root/child1/child1_2");

        // Fresh ids continue after the highest loaded id.
        let mut rebuilt = rebuilt;
        let id = rebuilt.insert(EntityKind::Category, "new");
        assert!(id > f.child1_2);

        let mut cyclic = nodes;
        cyclic[0].parent = Some(f.child1_1);
        assert!(matches!(
            Hierarchy::from_nodes(cyclic),
            Err(CoreError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_missing_node() {
        let f = fixture();
        assert!(matches!(
            f.h.level(NodeId(999)),
            Err(CoreError::NodeNotFound(_))
        ));
    }

    proptest! {
        #[test]
        fn test_level_matches_path(parents in prop::collection::vec(any::<prop::sample::Index>(), 1..40)) {
            let mut h = Hierarchy::new();
            let mut ids = Vec::new();
            for (i, pick) in parents.iter().enumerate() {
                let id = if i == 0 || pick.index(4) == 0 {
                    h.insert(EntityKind::Category, format!("n{i}"))
                } else {
                    let parent = ids[pick.index(ids.len())];
                    h.insert_under(EntityKind::Category, format!("n{i}"), parent).unwrap()
                };
                ids.push(id);
            }

            for &id in &ids {
                let path = h.path(id).unwrap();
                prop_assert_eq!(h.level(id).unwrap() + 1, path.len());
                prop_assert!(h.is_root(path[0]).unwrap());
                prop_assert_eq!(*path.last().unwrap(), id);
                for ancestor in &path[..path.len() - 1] {
                    prop_assert!(h.is_child_of(id, *ancestor).unwrap());
                    prop_assert!(!h.is_child_of(*ancestor, id).unwrap());
                }
                prop_assert_eq!(h.full_path(id, "/").unwrap().split('/').count(), path.len());
            }
        }
    }
}
