//! # Collaborator Interfaces
//!
//! The engine never owns the document tree or the live selection. It reads
//! and rearranges them through the traits in this module:
//!
//! - [`TreeProvider`]: structural reads plus the raw primitives that
//!   transactions sequence and reverse
//! - [`SelectionProvider`]: snapshot/restore of the live selection
//!
//! Nodes removed by a primitive must stay addressable. Transactions hold on
//! to them so undo can put them back.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::selection::SelectionState;

/// Opaque handle to a node owned by the host tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors reported by the host when a primitive is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Child index {index} out of range for {parent} ({len} children)")]
    IndexOutOfRange {
        parent: NodeId,
        index: usize,
        len: usize,
    },

    #[error("Offset {offset} out of range for {node} (length {len})")]
    OffsetOutOfRange { node: NodeId, offset: usize, len: usize },

    #[error("Node {0} cannot have children")]
    NotAContainer(NodeId),

    #[error("Node {0} is not text")]
    NotText(NodeId),

    #[error("Tree is read-only")]
    ReadOnly,

    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Structural access to the externally owned tree
pub trait TreeProvider {
    /// Root of the edited document
    fn root(&self) -> NodeId;

    /// Whether the handle refers to a live node (attached or detached)
    fn contains(&self, node: NodeId) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId>;

    fn child_count(&self, node: NodeId) -> usize;

    fn is_text(&self, node: NodeId) -> bool;

    /// Length in characters; zero for containers
    fn text_len(&self, node: NodeId) -> usize;

    fn text(&self, node: NodeId) -> Option<String>;

    /// Label of a container node (e.g. an element tag), if the host has one
    fn label(&self, _node: NodeId) -> Option<String> {
        None
    }

    /// Position of `node` within its parent
    fn index_of(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        (0..self.child_count(parent)).find(|&i| self.child_at(parent, i) == Some(node))
    }

    /// Offset space of a node: characters for text, children for containers
    fn content_len(&self, node: NodeId) -> usize {
        if self.is_text(node) {
            self.text_len(node)
        } else {
            self.child_count(node)
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Whether `node` is reachable from the root
    fn is_attached(&self, node: NodeId) -> bool {
        self.contains(node) && self.is_inclusive_ancestor(self.root(), node)
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId)
        -> Result<(), TreeError>;

    fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError>;

    fn insert_text(&mut self, node: NodeId, offset: usize, text: &str) -> Result<(), TreeError>;

    /// Removes `len` characters starting at `offset` and returns them
    fn remove_text(&mut self, node: NodeId, offset: usize, len: usize)
        -> Result<String, TreeError>;

    /// Moves the head `[0, offset)` of `node` into a left sibling inserted
    /// immediately before it. `reuse` supplies a detached, empty node of the
    /// same kind (used on redo); otherwise the host allocates one.
    fn split_node(
        &mut self,
        node: NodeId,
        offset: usize,
        reuse: Option<NodeId>,
    ) -> Result<NodeId, TreeError>;

    /// Inverse of [`TreeProvider::split_node`]: prepends `left`'s content to
    /// `node` and detaches `left`
    fn unsplit_node(&mut self, left: NodeId, node: NodeId) -> Result<(), TreeError>;

    /// Appends the content of `discard` (the next sibling of `keep`) to
    /// `keep` and detaches `discard`
    fn join_nodes(&mut self, keep: NodeId, discard: NodeId) -> Result<(), TreeError>;

    /// Inverse of [`TreeProvider::join_nodes`]: moves `keep[at..]` into the
    /// detached `discard` and reinserts it right after `keep`
    fn unjoin_nodes(&mut self, keep: NodeId, at: usize, discard: NodeId)
        -> Result<(), TreeError>;
}

/// Access to the live selection
pub trait SelectionProvider {
    fn current_selection(&self) -> SelectionState;

    fn set_selection(&mut self, selection: SelectionState);
}

/// Everything the engine needs from its host document
pub trait Host: TreeProvider + SelectionProvider {}

impl<T: TreeProvider + SelectionProvider> Host for T {}
