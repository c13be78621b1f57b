//! Tree nodes in the shape the front-end tree widget reads.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One entry of a navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeViewNode {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<TreeViewNode>,
}

impl TreeViewNode {
    pub fn new(text: impl Into<String>, href: Option<String>) -> Self {
        Self {
            text: text.into(),
            href,
            nodes: Vec::new(),
        }
    }

    /// A linked entry without children.
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(text, Some(href.into()))
    }

    /// An unlinked section holding `nodes`.
    pub fn section(text: impl Into<String>, nodes: Vec<TreeViewNode>) -> Self {
        Self {
            text: text.into(),
            href: None,
            nodes,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.nodes.iter().map(TreeViewNode::count).sum::<usize>()
    }
}

/// Serialize a forest for the tree widget.
pub fn to_json(tree: &[TreeViewNode]) -> Result<String> {
    Ok(serde_json::to_string(tree)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_skips_empty_fields() {
        let tree = vec![TreeViewNode::section(
            "Tools",
            vec![TreeViewNode::link("All parts", "/en/parts")],
        )];
        assert_eq!(
            to_json(&tree).unwrap(),
            r#"[{"text":"Tools","nodes":[{"text":"All parts","href":"/en/parts"}]}]"#
        );
        assert_eq!(tree[0].count(), 2);
        assert!(tree[0].nodes[0].is_leaf());
    }
}
