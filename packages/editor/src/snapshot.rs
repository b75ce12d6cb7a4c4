//! Structural snapshots of a tree, for comparing states and printing them.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::tree::{NodeId, TreeProvider};

/// Owned copy of a subtree, node identities included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSnapshot {
    Text {
        id: NodeId,
        text: String,
    },
    Element {
        id: NodeId,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        children: Vec<NodeSnapshot>,
    },
}

impl NodeSnapshot {
    pub fn capture<T: TreeProvider + ?Sized>(tree: &T, node: NodeId) -> Self {
        if tree.is_text(node) {
            return NodeSnapshot::Text {
                id: node,
                text: tree.text(node).unwrap_or_default(),
            };
        }
        let children = (0..tree.child_count(node))
            .filter_map(|i| tree.child_at(node, i))
            .map(|child| Self::capture(tree, child))
            .collect();
        NodeSnapshot::Element {
            id: node,
            label: tree.label(node),
            children,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            NodeSnapshot::Text { id, .. } | NodeSnapshot::Element { id, .. } => *id,
        }
    }

    /// Compact markup, e.g. `<body><p>Hello</p></body>`
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        match self {
            NodeSnapshot::Text { text, .. } => out.push_str(text),
            NodeSnapshot::Element {
                id,
                label,
                children,
            } => {
                let tag = label.clone().unwrap_or_else(|| format!("node{}", id.0));
                let _ = write!(out, "<{}>", tag);
                for child in children {
                    child.write_markup(out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryTree, NodeSpec};

    #[test]
    fn test_capture_and_markup() {
        let tree = MemoryTree::from_spec(&NodeSpec::element(
            "body",
            vec![NodeSpec::element("p", vec![NodeSpec::text("Hello")])],
        ));
        let snap = NodeSnapshot::capture(&tree, tree.root());
        assert_eq!(snap.id(), NodeId(0));
        assert_eq!(snap.to_markup(), "<body><p>Hello</p></body>");
    }

    #[test]
    fn test_snapshot_json() {
        let tree = MemoryTree::from_spec(&NodeSpec::element("p", vec![NodeSpec::text("a")]));
        let json = serde_json::to_string(&NodeSnapshot::capture(&tree, tree.root())).unwrap();
        assert_eq!(
            json,
            r#"{"id":0,"label":"p","children":[{"id":1,"text":"a"}]}"#
        );
    }
}
