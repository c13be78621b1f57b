//! Trees of structural elements for the sidebar and the admin pages.

use std::fmt;

use stockroom_core::{CoreError, EntityKind, Hierarchy, NodeId};
use stockroom_format::{UrlGenerator, UrlMethod};

use crate::cache::TreeCache;
use crate::error::Result;
use crate::labels::Labels;
use crate::node::TreeViewNode;

/// What the entries link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeMode {
    /// Parts list of each element.
    List,
    /// Edit page of each element, after a leading "new" entry.
    Edit,
}

impl fmt::Display for TreeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TreeMode::List => "list",
            TreeMode::Edit => "edit",
        })
    }
}

/// Invalidation tag of trees showing elements of `kind`.
pub fn kind_tag(kind: EntityKind) -> String {
    format!("tree_{}", kind.as_str())
}

#[derive(Debug, Clone)]
pub struct EntityTreeBuilder {
    labels: Labels,
    urls: UrlGenerator,
}

impl EntityTreeBuilder {
    pub fn new(labels: Labels, urls: UrlGenerator) -> Self {
        Self { labels, urls }
    }

    /// Elements of `kind` as nested nodes, siblings sorted by name.
    pub fn tree(&self, hierarchy: &Hierarchy, kind: EntityKind, mode: TreeMode) -> Result<Vec<TreeViewNode>> {
        let mut nodes = Vec::new();
        if mode == TreeMode::Edit {
            nodes.push(TreeViewNode::link(
                self.labels.get("entity.tree.new"),
                self.urls.url(kind, None, UrlMethod::New)?,
            ));
        }
        for root in sorted(hierarchy, hierarchy.roots(kind)) {
            nodes.push(self.subtree(hierarchy, root, kind, mode)?);
        }
        Ok(nodes)
    }

    /// [`tree`](Self::tree) through `cache`, tagged with [`kind_tag`].
    pub fn cached_tree(
        &self,
        cache: &TreeCache,
        hierarchy: &Hierarchy,
        kind: EntityKind,
        mode: TreeMode,
    ) -> Result<Vec<TreeViewNode>> {
        let key = format!("tree_{}_{}", kind.as_str(), mode);
        cache.get_or_insert_with(&key, vec![kind_tag(kind)], || {
            self.tree(hierarchy, kind, mode)
        })
    }

    fn subtree(
        &self,
        hierarchy: &Hierarchy,
        id: NodeId,
        kind: EntityKind,
        mode: TreeMode,
    ) -> Result<TreeViewNode> {
        let node = hierarchy
            .get(id)
            .ok_or(CoreError::NodeNotFound(id))?;
        let method = match mode {
            TreeMode::List => UrlMethod::List,
            TreeMode::Edit => UrlMethod::Edit,
        };
        let mut out = TreeViewNode::link(node.name.clone(), self.urls.url(kind, Some(id.0), method)?);
        for child in sorted(hierarchy, hierarchy.children(id).collect()) {
            out.nodes.push(self.subtree(hierarchy, child, kind, mode)?);
        }
        Ok(out)
    }
}

impl Default for EntityTreeBuilder {
    fn default() -> Self {
        Self::new(Labels::english(), UrlGenerator::default())
    }
}

fn sorted(hierarchy: &Hierarchy, mut ids: Vec<NodeId>) -> Vec<NodeId> {
    ids.sort_by(|a, b| {
        let name = |id: &NodeId| hierarchy.get(*id).map(|n| n.name.to_lowercase());
        name(a).cmp(&name(b)).then(a.cmp(b))
    });
    ids
}
