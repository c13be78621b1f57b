//! The tools menu: edit, show and system sections filtered by permission.

use stockroom_core::EntityKind;
use stockroom_format::{UrlGenerator, UrlMethod, UrlTarget};
use stockroom_perms::Authorizer;

use crate::cache::{TreeCache, TAG_GROUPS, TAG_TREE_TOOLS};
use crate::error::Result;
use crate::labels::Labels;
use crate::node::TreeViewNode;

/// Edit entries in menu order, with their label keys.
const EDIT_ENTRIES: [(EntityKind, &str); 9] = [
    (EntityKind::AttachmentType, "tree.tools.edit.attachment_types"),
    (EntityKind::Category, "tree.tools.edit.categories"),
    (EntityKind::Device, "tree.tools.edit.devices"),
    (EntityKind::Supplier, "tree.tools.edit.suppliers"),
    (EntityKind::Manufacturer, "tree.tools.edit.manufacturer"),
    (EntityKind::Storelocation, "tree.tools.edit.storelocation"),
    (EntityKind::Footprint, "tree.tools.edit.footprint"),
    (EntityKind::Currency, "tree.tools.edit.currency"),
    (EntityKind::MeasurementUnit, "tree.tools.edit.measurement_unit"),
];

/// Builds the tools menu for one principal.
#[derive(Debug, Clone)]
pub struct ToolsTreeBuilder {
    labels: Labels,
    urls: UrlGenerator,
}

impl ToolsTreeBuilder {
    pub fn new(labels: Labels, urls: UrlGenerator) -> Self {
        Self { labels, urls }
    }

    /// Cache key of the tools tree for `auth`.
    pub fn cache_key(auth: &dyn Authorizer) -> String {
        format!("tree_tools_{}", auth.cache_key())
    }

    /// The three sections, uncached. Sections are kept even when empty.
    pub fn tree(&self, auth: &dyn Authorizer) -> Result<Vec<TreeViewNode>> {
        Ok(vec![
            TreeViewNode::section(self.labels.get("tree.tools.edit"), self.edit_nodes(auth)?),
            TreeViewNode::section(self.labels.get("tree.tools.show"), self.show_nodes(auth)),
            TreeViewNode::section(
                self.labels.get("tree.tools.system"),
                self.system_nodes(auth)?,
            ),
        ])
    }

    /// [`tree`](Self::tree) through `cache`.
    ///
    /// Tagged with `tree_tools`, `groups`, the principal's cache key and the
    /// principal's own tags.
    pub fn cached_tree(&self, cache: &TreeCache, auth: &dyn Authorizer) -> Result<Vec<TreeViewNode>> {
        let key = Self::cache_key(auth);
        let mut tags = vec![
            TAG_TREE_TOOLS.to_string(),
            TAG_GROUPS.to_string(),
            auth.cache_key(),
        ];
        tags.extend(auth.cache_tags());
        cache.get_or_insert_with(&key, tags, || self.tree(auth))
    }

    fn edit_nodes(&self, auth: &dyn Authorizer) -> Result<Vec<TreeViewNode>> {
        let mut nodes = Vec::new();
        for (kind, label) in EDIT_ENTRIES {
            if auth.is_granted(kind.permission(), "read") {
                nodes.push(TreeViewNode::link(
                    self.labels.get(label),
                    self.urls.url(kind, None, UrlMethod::New)?,
                ));
            }
        }
        if auth.is_granted("parts", "create") {
            nodes.push(TreeViewNode::link(
                self.labels.get("tree.tools.edit.part"),
                self.urls.url(UrlTarget::Part, None, UrlMethod::New)?,
            ));
        }
        Ok(nodes)
    }

    fn show_nodes(&self, auth: &dyn Authorizer) -> Vec<TreeViewNode> {
        let mut nodes = vec![TreeViewNode::link(
            self.labels.get("tree.tools.show.all_parts"),
            self.urls.parts_list(),
        )];
        if auth.is_granted("parts_attachments", "read") {
            nodes.push(TreeViewNode::link(
                self.labels.get("tree.tools.show.all_attachments"),
                self.urls.attachment_list(),
            ));
        }
        nodes
    }

    fn system_nodes(&self, auth: &dyn Authorizer) -> Result<Vec<TreeViewNode>> {
        let mut nodes = Vec::new();
        if auth.is_granted("users", "read") {
            nodes.push(TreeViewNode::link(
                self.labels.get("tree.tools.system.users"),
                self.urls.url(UrlTarget::User, None, UrlMethod::New)?,
            ));
        }
        if auth.is_granted(EntityKind::Group.permission(), "read") {
            nodes.push(TreeViewNode::link(
                self.labels.get("tree.tools.system.groups"),
                self.urls.url(EntityKind::Group, None, UrlMethod::New)?,
            ));
        }
        Ok(nodes)
    }
}

impl Default for ToolsTreeBuilder {
    fn default() -> Self {
        Self::new(Labels::english(), UrlGenerator::default())
    }
}
