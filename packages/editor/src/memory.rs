//! # In-memory Host
//!
//! Arena-backed tree of element and text nodes plus a live selection.
//! Used by tests, benchmarks and the replay tool; real hosts implement
//! [`TreeProvider`] and [`SelectionProvider`] over their own document.
//!
//! Nodes are never freed. Detached nodes keep their content so transactions
//! can reattach them on undo.

use serde::{Deserialize, Serialize};

use crate::selection::SelectionState;
use crate::tree::{NodeId, SelectionProvider, TreeError, TreeProvider};

/// Declarative description of a subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text {
        text: String,
    },
    Element {
        tag: String,
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
}

impl NodeSpec {
    pub fn text(text: impl Into<String>) -> Self {
        NodeSpec::Text { text: text.into() }
    }

    pub fn element(tag: impl Into<String>, children: Vec<NodeSpec>) -> Self {
        NodeSpec::Element {
            tag: tag.into(),
            children,
        }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element { tag: String, children: Vec<NodeId> },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Reference host
#[derive(Debug, Clone)]
pub struct MemoryTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    selection: SelectionState,
    read_only: bool,
    /// Remaining primitive calls before the host starts rejecting them
    write_budget: Option<usize>,
}

impl MemoryTree {
    /// Create a tree holding a single empty root element
    pub fn new(root_tag: impl Into<String>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            selection: SelectionState::new(),
            read_only: false,
            write_budget: None,
        };
        tree.root = tree.create_element(root_tag);
        tree
    }

    /// Build a tree from a description; node ids are assigned in pre-order
    /// starting at the root
    pub fn from_spec(spec: &NodeSpec) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            selection: SelectionState::new(),
            read_only: false,
            write_budget: None,
        };
        tree.root = tree.create_from_spec(spec);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a detached element
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.into(),
            children: Vec::new(),
        })
    }

    /// Allocate a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Allocate a detached subtree
    pub fn create_from_spec(&mut self, spec: &NodeSpec) -> NodeId {
        match spec {
            NodeSpec::Text { text } => self.create_text(text.clone()),
            NodeSpec::Element { tag, children } => {
                let id = self.create_element(tag.clone());
                for child in children {
                    let child_id = self.create_from_spec(child);
                    self.attach(id, usize::MAX, child_id);
                }
                id
            }
        }
    }

    /// Setup helper: append a detached node without going through the
    /// engine (and without consuming the write budget)
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_attachable(parent, child)?;
        self.attach(parent, usize::MAX, child);
        Ok(())
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match self.nodes.get(node.0 as usize).map(|n| &n.kind) {
            Some(NodeKind::Element { children, .. }) => children,
            _ => &[],
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.nodes.get(node.0 as usize).map(|n| &n.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    /// Reject every primitive while set
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Accept `n` more primitives, then reject; `None` lifts the limit
    pub fn fail_after(&mut self, n: Option<usize>) {
        self.write_budget = n;
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData { parent: None, kind });
        id
    }

    fn node(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(TreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(TreeError::NodeNotFound(id))
    }

    fn children_mut(&mut self, id: NodeId) -> Result<&mut Vec<NodeId>, TreeError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element { children, .. } => Ok(children),
            NodeKind::Text(_) => Err(TreeError::NotAContainer(id)),
        }
    }

    fn text_mut(&mut self, id: NodeId) -> Result<&mut String, TreeError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Text(text) => Ok(text),
            NodeKind::Element { .. } => Err(TreeError::NotText(id)),
        }
    }

    fn write_guard(&mut self) -> Result<(), TreeError> {
        if self.read_only {
            return Err(TreeError::ReadOnly);
        }
        match self.write_budget {
            Some(0) => Err(TreeError::Rejected("write budget exhausted".to_string())),
            Some(n) => {
                self.write_budget = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if !matches!(self.node(parent)?.kind, NodeKind::Element { .. }) {
            return Err(TreeError::NotAContainer(parent));
        }
        if self.node(child)?.parent.is_some() {
            return Err(TreeError::Rejected(format!("{} is already attached", child)));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(TreeError::Rejected(format!(
                "{} cannot be inserted into its own subtree",
                child
            )));
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let NodeKind::Element { children, .. } = &mut self.nodes[parent.0 as usize].kind {
            let index = index.min(children.len());
            children.insert(index, child);
        }
        self.nodes[child.0 as usize].parent = Some(parent);
    }

    fn attached_index(&self, node: NodeId) -> Result<(NodeId, usize), TreeError> {
        let parent = self
            .node(node)?
            .parent
            .ok_or_else(|| TreeError::Rejected(format!("{} is detached", node)))?;
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == node)
            .ok_or(TreeError::NodeNotFound(node))?;
        Ok((parent, index))
    }

    fn same_kind(&self, a: NodeId, b: NodeId) -> Result<bool, TreeError> {
        Ok(matches!(
            (&self.node(a)?.kind, &self.node(b)?.kind),
            (NodeKind::Text(_), NodeKind::Text(_)) | (NodeKind::Element { .. }, NodeKind::Element { .. })
        ))
    }

    fn empty_like(&mut self, model: NodeId) -> Result<NodeId, TreeError> {
        let kind = match &self.node(model)?.kind {
            NodeKind::Text(_) => NodeKind::Text(String::new()),
            NodeKind::Element { tag, .. } => NodeKind::Element {
                tag: tag.clone(),
                children: Vec::new(),
            },
        };
        Ok(self.alloc(kind))
    }

    fn check_reusable(&self, reuse: NodeId, model: NodeId) -> Result<(), TreeError> {
        let data = self.node(reuse)?;
        if data.parent.is_some() {
            return Err(TreeError::Rejected(format!("{} is already attached", reuse)));
        }
        if !self.same_kind(reuse, model)? || self.content_len(reuse) != 0 {
            return Err(TreeError::Rejected(format!(
                "{} cannot receive content of {}",
                reuse, model
            )));
        }
        Ok(())
    }

    /// Move `[from, to)` of `src` to the front (or back) of `dst`
    fn move_content(
        &mut self,
        src: NodeId,
        from: usize,
        to: usize,
        dst: NodeId,
        at_front: bool,
    ) -> Result<(), TreeError> {
        if self.is_text(src) {
            let moved: String = {
                let text = self.text_mut(src)?;
                let start = byte_offset(text, from);
                let end = byte_offset(text, to);
                text.drain(start..end).collect()
            };
            let dst_text = self.text_mut(dst)?;
            if at_front {
                dst_text.insert_str(0, &moved);
            } else {
                dst_text.push_str(&moved);
            }
        } else {
            let moved: Vec<NodeId> = self.children_mut(src)?.drain(from..to).collect();
            for &child in &moved {
                self.nodes[child.0 as usize].parent = Some(dst);
            }
            let dst_children = self.children_mut(dst)?;
            if at_front {
                dst_children.splice(0..0, moved);
            } else {
                dst_children.extend(moved);
            }
        }
        Ok(())
    }
}

impl TreeProvider for MemoryTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn contains(&self, node: NodeId) -> bool {
        (node.0 as usize) < self.nodes.len()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0 as usize)?.parent
    }

    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.children(node).get(index).copied()
    }

    fn child_count(&self, node: NodeId) -> usize {
        self.children(node).len()
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node.0 as usize).map(|n| &n.kind),
            Some(NodeKind::Text(_))
        )
    }

    fn text_len(&self, node: NodeId) -> usize {
        match self.nodes.get(node.0 as usize).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => text.chars().count(),
            _ => 0,
        }
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.nodes.get(node.0 as usize)?.kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    fn label(&self, node: NodeId) -> Option<String> {
        self.tag(node).map(str::to_string)
    }

    fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.write_guard()?;
        self.check_attachable(parent, child)?;
        let len = self.child_count(parent);
        if index > len {
            return Err(TreeError::IndexOutOfRange { parent, index, len });
        }
        self.attach(parent, index, child);
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        self.write_guard()?;
        let children = self.children_mut(parent)?;
        let len = children.len();
        if index >= len {
            return Err(TreeError::IndexOutOfRange { parent, index, len });
        }
        let child = children.remove(index);
        self.nodes[child.0 as usize].parent = None;
        Ok(child)
    }

    fn insert_text(&mut self, node: NodeId, offset: usize, text: &str) -> Result<(), TreeError> {
        self.write_guard()?;
        let buffer = self.text_mut(node)?;
        let len = buffer.chars().count();
        if offset > len {
            return Err(TreeError::OffsetOutOfRange { node, offset, len });
        }
        let at = byte_offset(buffer, offset);
        buffer.insert_str(at, text);
        Ok(())
    }

    fn remove_text(
        &mut self,
        node: NodeId,
        offset: usize,
        len: usize,
    ) -> Result<String, TreeError> {
        self.write_guard()?;
        let buffer = self.text_mut(node)?;
        let total = buffer.chars().count();
        let end = match offset.checked_add(len) {
            Some(end) if end <= total => end,
            _ => {
                return Err(TreeError::OffsetOutOfRange {
                    node,
                    offset: offset.saturating_add(len),
                    len: total,
                })
            }
        };
        let start = byte_offset(buffer, offset);
        let end = byte_offset(buffer, end);
        Ok(buffer.drain(start..end).collect())
    }

    fn split_node(
        &mut self,
        node: NodeId,
        offset: usize,
        reuse: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        self.write_guard()?;
        let (parent, index) = self.attached_index(node)?;
        let len = self.content_len(node);
        if offset > len {
            return Err(TreeError::OffsetOutOfRange { node, offset, len });
        }
        let left = match reuse {
            Some(left) => {
                self.check_reusable(left, node)?;
                left
            }
            None => self.empty_like(node)?,
        };
        self.move_content(node, 0, offset, left, false)?;
        self.attach(parent, index, left);
        Ok(left)
    }

    fn unsplit_node(&mut self, left: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.write_guard()?;
        let (parent, left_index) = self.attached_index(left)?;
        if self.child_at(parent, left_index + 1) != Some(node) {
            return Err(TreeError::Rejected(format!(
                "{} is not the previous sibling of {}",
                left, node
            )));
        }
        let len = self.content_len(left);
        self.move_content(left, 0, len, node, true)?;
        self.children_mut(parent)?.remove(left_index);
        self.nodes[left.0 as usize].parent = None;
        Ok(())
    }

    fn join_nodes(&mut self, keep: NodeId, discard: NodeId) -> Result<(), TreeError> {
        self.write_guard()?;
        let (parent, keep_index) = self.attached_index(keep)?;
        if self.child_at(parent, keep_index + 1) != Some(discard) {
            return Err(TreeError::Rejected(format!(
                "{} is not the next sibling of {}",
                discard, keep
            )));
        }
        if !self.same_kind(keep, discard)? {
            return Err(TreeError::Rejected(format!(
                "{} and {} are different kinds of node",
                keep, discard
            )));
        }
        let len = self.content_len(discard);
        self.move_content(discard, 0, len, keep, false)?;
        self.children_mut(parent)?.remove(keep_index + 1);
        self.nodes[discard.0 as usize].parent = None;
        Ok(())
    }

    fn unjoin_nodes(&mut self, keep: NodeId, at: usize, discard: NodeId) -> Result<(), TreeError> {
        self.write_guard()?;
        let (parent, keep_index) = self.attached_index(keep)?;
        let len = self.content_len(keep);
        if at > len {
            return Err(TreeError::OffsetOutOfRange {
                node: keep,
                offset: at,
                len,
            });
        }
        self.check_reusable(discard, keep)?;
        self.move_content(keep, at, len, discard, false)?;
        self.attach(parent, keep_index + 1, discard);
        Ok(())
    }
}

impl SelectionProvider for MemoryTree {
    fn current_selection(&self) -> SelectionState {
        self.selection.clone()
    }

    fn set_selection(&mut self, selection: SelectionState) {
        self.selection = selection;
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
