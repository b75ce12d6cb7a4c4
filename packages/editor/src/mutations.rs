//! # Edit Operations
//!
//! The primitive edits callers can request.
//!
//! ## Semantics
//!
//! ### Preconditions
//! - Checked against the tree before any listener hears about the edit
//! - Checked again after `will_mutate` listeners ran, since they may edit
//! - A violated precondition changes nothing and records nothing
//!
//! ### Indices
//! - Container offsets count children, text offsets count characters
//! - `MoveNode` index is counted after the node left its old parent
//!
//! ### Split / Join
//! - Split at any offset (0 and length included) creates a new left sibling
//! - Join requires adjacent siblings of the same kind, `keep` first

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::transaction::Transaction;
use crate::tree::{NodeId, TreeProvider};

/// A requested edit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EditOp {
    /// Attach a detached node under `parent` at `index`
    InsertNode {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },

    /// Detach the child at `index` of `parent`
    DeleteNode { parent: NodeId, index: usize },

    /// Split `node` at `offset`; content before it moves into a new left
    /// sibling
    SplitNode { node: NodeId, offset: usize },

    /// Move the content of `discard` onto the end of `keep`, then detach
    /// `discard`
    JoinNodes { keep: NodeId, discard: NodeId },

    /// Relocate an attached node
    MoveNode {
        node: NodeId,
        new_parent: NodeId,
        index: usize,
    },

    InsertText {
        node: NodeId,
        offset: usize,
        text: String,
    },

    DeleteText {
        node: NodeId,
        offset: usize,
        len: usize,
    },
}

/// Kind reported to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    InsertNode,
    DeleteNode,
    SplitNode,
    JoinNodes,
    MoveNode,
    InsertText,
    DeleteText,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationKind::InsertNode => "insert-node",
            MutationKind::DeleteNode => "delete-node",
            MutationKind::SplitNode => "split-node",
            MutationKind::JoinNodes => "join-nodes",
            MutationKind::MoveNode => "move-node",
            MutationKind::InsertText => "insert-text",
            MutationKind::DeleteText => "delete-text",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node is not a container: {0}")]
    NotAContainer(NodeId),

    #[error("Node is not text: {0}")]
    NotText(NodeId),

    #[error("Index {index} out of range for {parent} with {len} children")]
    IndexOutOfRange {
        parent: NodeId,
        index: usize,
        len: usize,
    },

    #[error("Offset {offset} out of range for {node} of length {len}")]
    OffsetOutOfRange {
        node: NodeId,
        offset: usize,
        len: usize,
    },

    #[error("Node has no parent: {0}")]
    Detached(NodeId),

    #[error("Node is already attached: {0}")]
    AlreadyAttached(NodeId),

    #[error("{discard} does not directly follow {keep}")]
    NotAdjacent { keep: NodeId, discard: NodeId },

    #[error("Cannot join {keep} with {discard} of a different kind")]
    KindMismatch { keep: NodeId, discard: NodeId },

    #[error("Would create cycle: {node} under {parent}")]
    CycleDetected { node: NodeId, parent: NodeId },
}

fn existing<T: TreeProvider + ?Sized>(tree: &T, node: NodeId) -> Result<(), PreconditionError> {
    if tree.contains(node) {
        Ok(())
    } else {
        Err(PreconditionError::NodeNotFound(node))
    }
}

fn container<T: TreeProvider + ?Sized>(tree: &T, node: NodeId) -> Result<(), PreconditionError> {
    existing(tree, node)?;
    if tree.is_text(node) {
        return Err(PreconditionError::NotAContainer(node));
    }
    Ok(())
}

fn text_node<T: TreeProvider + ?Sized>(tree: &T, node: NodeId) -> Result<usize, PreconditionError> {
    existing(tree, node)?;
    if !tree.is_text(node) {
        return Err(PreconditionError::NotText(node));
    }
    Ok(tree.text_len(node))
}

fn attached<T: TreeProvider + ?Sized>(tree: &T, node: NodeId) -> Result<NodeId, PreconditionError> {
    existing(tree, node)?;
    tree.parent(node).ok_or(PreconditionError::Detached(node))
}

impl EditOp {
    pub fn kind(&self) -> MutationKind {
        match self {
            EditOp::InsertNode { .. } => MutationKind::InsertNode,
            EditOp::DeleteNode { .. } => MutationKind::DeleteNode,
            EditOp::SplitNode { .. } => MutationKind::SplitNode,
            EditOp::JoinNodes { .. } => MutationKind::JoinNodes,
            EditOp::MoveNode { .. } => MutationKind::MoveNode,
            EditOp::InsertText { .. } => MutationKind::InsertText,
            EditOp::DeleteText { .. } => MutationKind::DeleteText,
        }
    }

    /// Kind as listeners see it: a text delete that empties its node is
    /// reported as a node delete
    pub fn notification_kind<T: TreeProvider + ?Sized>(&self, tree: &T) -> MutationKind {
        match self {
            EditOp::DeleteText { node, len, .. } if *len > 0 && *len == tree.text_len(*node) => {
                MutationKind::DeleteNode
            }
            _ => self.kind(),
        }
    }

    /// Check preconditions without touching the tree
    pub fn validate<T: TreeProvider + ?Sized>(&self, tree: &T) -> Result<(), PreconditionError> {
        match self {
            EditOp::InsertNode {
                parent,
                index,
                node,
            } => {
                container(tree, *parent)?;
                existing(tree, *node)?;
                if tree.parent(*node).is_some() {
                    return Err(PreconditionError::AlreadyAttached(*node));
                }
                if tree.is_inclusive_ancestor(*node, *parent) {
                    return Err(PreconditionError::CycleDetected {
                        node: *node,
                        parent: *parent,
                    });
                }
                let len = tree.child_count(*parent);
                if *index > len {
                    return Err(PreconditionError::IndexOutOfRange {
                        parent: *parent,
                        index: *index,
                        len,
                    });
                }
                Ok(())
            }

            EditOp::DeleteNode { parent, index } => {
                container(tree, *parent)?;
                let len = tree.child_count(*parent);
                if *index >= len {
                    return Err(PreconditionError::IndexOutOfRange {
                        parent: *parent,
                        index: *index,
                        len,
                    });
                }
                Ok(())
            }

            EditOp::SplitNode { node, offset } => {
                attached(tree, *node)?;
                let len = tree.content_len(*node);
                if *offset > len {
                    return Err(PreconditionError::OffsetOutOfRange {
                        node: *node,
                        offset: *offset,
                        len,
                    });
                }
                Ok(())
            }

            EditOp::JoinNodes { keep, discard } => {
                let parent = attached(tree, *keep)?;
                existing(tree, *discard)?;
                let adjacent = tree.parent(*discard) == Some(parent)
                    && match (tree.index_of(*keep), tree.index_of(*discard)) {
                        (Some(k), Some(d)) => d == k + 1,
                        _ => false,
                    };
                if !adjacent {
                    return Err(PreconditionError::NotAdjacent {
                        keep: *keep,
                        discard: *discard,
                    });
                }
                if tree.is_text(*keep) != tree.is_text(*discard) {
                    return Err(PreconditionError::KindMismatch {
                        keep: *keep,
                        discard: *discard,
                    });
                }
                Ok(())
            }

            EditOp::MoveNode {
                node,
                new_parent,
                index,
            } => {
                let old_parent = attached(tree, *node)?;
                container(tree, *new_parent)?;
                if tree.is_inclusive_ancestor(*node, *new_parent) {
                    return Err(PreconditionError::CycleDetected {
                        node: *node,
                        parent: *new_parent,
                    });
                }
                let mut len = tree.child_count(*new_parent);
                if old_parent == *new_parent {
                    len -= 1;
                }
                if *index > len {
                    return Err(PreconditionError::IndexOutOfRange {
                        parent: *new_parent,
                        index: *index,
                        len,
                    });
                }
                Ok(())
            }

            EditOp::InsertText { node, offset, .. } => {
                let len = text_node(tree, *node)?;
                if *offset > len {
                    return Err(PreconditionError::OffsetOutOfRange {
                        node: *node,
                        offset: *offset,
                        len,
                    });
                }
                Ok(())
            }

            EditOp::DeleteText { node, offset, len } => {
                let total = text_node(tree, *node)?;
                match offset.checked_add(*len) {
                    Some(end) if end <= total => Ok(()),
                    _ => Err(PreconditionError::OffsetOutOfRange {
                        node: *node,
                        offset: offset.saturating_add(*len),
                        len: total,
                    }),
                }
            }
        }
    }

    /// The leaf transaction that performs this edit
    pub fn to_transaction(&self) -> Transaction {
        match self {
            EditOp::InsertNode {
                parent,
                index,
                node,
            } => Transaction::insert_node(*parent, *index, *node),
            EditOp::DeleteNode { parent, index } => Transaction::delete_node(*parent, *index),
            EditOp::SplitNode { node, offset } => Transaction::split_node(*node, *offset),
            EditOp::JoinNodes { keep, discard } => Transaction::join_nodes(*keep, *discard),
            EditOp::MoveNode {
                node,
                new_parent,
                index,
            } => Transaction::move_node(*node, *new_parent, *index),
            EditOp::InsertText { node, offset, text } => {
                Transaction::insert_text(*node, *offset, text.clone())
            }
            EditOp::DeleteText { node, offset, len } => {
                Transaction::delete_text(*node, *offset, *len)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryTree, NodeSpec};

    /// body#0 > [p#1 > "Hello"#2, p#3 > "World"#4]
    fn tree() -> MemoryTree {
        MemoryTree::from_spec(&NodeSpec::element(
            "body",
            vec![
                NodeSpec::element("p", vec![NodeSpec::text("Hello")]),
                NodeSpec::element("p", vec![NodeSpec::text("World")]),
            ],
        ))
    }

    #[test]
    fn test_insert_node_preconditions() {
        let mut t = tree();
        let fresh = t.create_element("div");

        let op = EditOp::InsertNode {
            parent: NodeId(0),
            index: 2,
            node: fresh,
        };
        assert_eq!(op.validate(&t), Ok(()));

        let op = EditOp::InsertNode {
            parent: NodeId(0),
            index: 3,
            node: fresh,
        };
        assert!(matches!(
            op.validate(&t),
            Err(PreconditionError::IndexOutOfRange { len: 2, .. })
        ));

        let op = EditOp::InsertNode {
            parent: NodeId(0),
            index: 0,
            node: NodeId(1),
        };
        assert_eq!(op.validate(&t), Err(PreconditionError::AlreadyAttached(NodeId(1))));

        let op = EditOp::InsertNode {
            parent: NodeId(2),
            index: 0,
            node: fresh,
        };
        assert_eq!(op.validate(&t), Err(PreconditionError::NotAContainer(NodeId(2))));

        let op = EditOp::InsertNode {
            parent: NodeId(1),
            index: 0,
            node: NodeId(0),
        };
        assert!(matches!(
            op.validate(&t),
            Err(PreconditionError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_move_index_counts_after_removal() {
        let t = tree();
        let op = EditOp::MoveNode {
            node: NodeId(1),
            new_parent: NodeId(0),
            index: 1,
        };
        assert_eq!(op.validate(&t), Ok(()));

        let op = EditOp::MoveNode {
            node: NodeId(1),
            new_parent: NodeId(0),
            index: 2,
        };
        assert!(op.validate(&t).is_err());

        let op = EditOp::MoveNode {
            node: NodeId(1),
            new_parent: NodeId(1),
            index: 0,
        };
        assert!(matches!(
            op.validate(&t),
            Err(PreconditionError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_join_requires_adjacent_same_kind() {
        let t = tree();
        let op = EditOp::JoinNodes {
            keep: NodeId(1),
            discard: NodeId(3),
        };
        assert_eq!(op.validate(&t), Ok(()));

        let op = EditOp::JoinNodes {
            keep: NodeId(3),
            discard: NodeId(1),
        };
        assert!(matches!(
            op.validate(&t),
            Err(PreconditionError::NotAdjacent { .. })
        ));

        let op = EditOp::JoinNodes {
            keep: NodeId(2),
            discard: NodeId(4),
        };
        assert!(matches!(
            op.validate(&t),
            Err(PreconditionError::NotAdjacent { .. })
        ));
    }

    #[test]
    fn test_text_offsets() {
        let t = tree();
        let op = EditOp::InsertText {
            node: NodeId(2),
            offset: 5,
            text: "!".to_string(),
        };
        assert_eq!(op.validate(&t), Ok(()));

        let op = EditOp::DeleteText {
            node: NodeId(2),
            offset: 3,
            len: 3,
        };
        assert!(matches!(
            op.validate(&t),
            Err(PreconditionError::OffsetOutOfRange { offset: 6, len: 5, .. })
        ));

        let op = EditOp::DeleteText {
            node: NodeId(2),
            offset: 1,
            len: usize::MAX,
        };
        assert!(matches!(
            op.validate(&t),
            Err(PreconditionError::OffsetOutOfRange { offset: usize::MAX, len: 5, .. })
        ));

        let op = EditOp::InsertText {
            node: NodeId(1),
            offset: 0,
            text: "x".to_string(),
        };
        assert_eq!(op.validate(&t), Err(PreconditionError::NotText(NodeId(1))));
    }

    #[test]
    fn test_split_detached_node_is_rejected() {
        let mut t = tree();
        let loose = t.create_text("loose");
        let op = EditOp::SplitNode {
            node: loose,
            offset: 2,
        };
        assert_eq!(op.validate(&t), Err(PreconditionError::Detached(loose)));
    }

    #[test]
    fn test_emptying_text_delete_reports_node_delete() {
        let t = tree();
        let partial = EditOp::DeleteText {
            node: NodeId(2),
            offset: 1,
            len: 2,
        };
        assert_eq!(partial.notification_kind(&t), MutationKind::DeleteText);

        let full = EditOp::DeleteText {
            node: NodeId(2),
            offset: 0,
            len: 5,
        };
        assert_eq!(full.kind(), MutationKind::DeleteText);
        assert_eq!(full.notification_kind(&t), MutationKind::DeleteNode);
    }

    #[test]
    fn test_edit_op_serialization() {
        let op = EditOp::InsertText {
            node: NodeId(2),
            offset: 0,
            text: "Hi".to_string(),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"{"InsertText":{"node":2,"offset":0,"text":"Hi"}}"#);
        let back: EditOp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
