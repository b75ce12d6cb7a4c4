//! # Range Tracking
//!
//! Keeps registered [`SelectionState`]s pointing at the same logical content
//! while the tree changes underneath them.
//!
//! ## Protocol
//!
//! - Callers `register` a snapshot and get a [`TrackerId`] back
//! - Every successful primitive is followed by exactly one adjustment,
//!   before any "did" notification fires
//! - Callers `unregister` to take the adjusted snapshot back out
//!
//! The tracker holds node identifiers only. Positions inside a removed
//! subtree collapse onto the removal point instead of dangling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::selection::{Position, SelectionState};
use crate::tree::{NodeId, TreeProvider};

/// Handle to a registered snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackerId(u64);

/// A physical change, described by what it did to offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeChange {
    InsertNode {
        parent: NodeId,
        index: usize,
    },
    DeleteNode {
        parent: NodeId,
        index: usize,
        removed: NodeId,
    },
    /// `node[0..offset)` moved into `left`, inserted at `left_index`
    SplitNode {
        node: NodeId,
        offset: usize,
        left: NodeId,
        parent: NodeId,
        left_index: usize,
    },
    /// `left` (of length `left_len`) prepended to `node` and detached
    UnsplitNode {
        left: NodeId,
        left_len: usize,
        node: NodeId,
        parent: NodeId,
        left_index: usize,
    },
    /// `discard` appended to `keep` (whose length was `keep_len`) and detached
    JoinNodes {
        keep: NodeId,
        keep_len: usize,
        discard: NodeId,
        parent: NodeId,
        discard_index: usize,
    },
    /// `keep[keep_len..]` moved into `discard`, reinserted at `discard_index`
    UnjoinNodes {
        keep: NodeId,
        keep_len: usize,
        discard: NodeId,
        parent: NodeId,
        discard_index: usize,
    },
    /// `new_index` is counted after the node left `old_parent`
    MoveNode {
        old_parent: NodeId,
        old_index: usize,
        new_parent: NodeId,
        new_index: usize,
    },
    InsertText {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    DeleteText {
        node: NodeId,
        offset: usize,
        len: usize,
    },
}

impl RangeChange {
    /// Adjust one position; `removed_subtree` answers whether a node lies
    /// inside a subtree that was just detached
    fn apply(&self, pos: &mut Position, removed_subtree: &dyn Fn(NodeId) -> bool) {
        match *self {
            RangeChange::InsertNode { parent, index } => {
                if pos.node == parent && pos.offset >= index {
                    pos.offset += 1;
                }
            }
            RangeChange::DeleteNode { parent, index, .. } => {
                if removed_subtree(pos.node) {
                    *pos = Position::new(parent, index);
                } else if pos.node == parent && pos.offset > index {
                    pos.offset -= 1;
                }
            }
            RangeChange::SplitNode {
                node,
                offset,
                left,
                parent,
                left_index,
            } => {
                if pos.node == node {
                    if pos.offset < offset {
                        pos.node = left;
                    } else {
                        pos.offset -= offset;
                    }
                } else if pos.node == parent && pos.offset >= left_index {
                    pos.offset += 1;
                }
            }
            RangeChange::UnsplitNode {
                left,
                left_len,
                node,
                parent,
                left_index,
            } => {
                if pos.node == left {
                    pos.node = node;
                } else if pos.node == node {
                    pos.offset += left_len;
                } else if pos.node == parent && pos.offset > left_index {
                    pos.offset -= 1;
                }
            }
            RangeChange::JoinNodes {
                keep,
                keep_len,
                discard,
                parent,
                discard_index,
            } => {
                if pos.node == discard {
                    *pos = Position::new(keep, keep_len + pos.offset);
                } else if pos.node == parent && pos.offset > discard_index {
                    pos.offset -= 1;
                }
            }
            RangeChange::UnjoinNodes {
                keep,
                keep_len,
                discard,
                parent,
                discard_index,
            } => {
                if pos.node == keep && pos.offset >= keep_len {
                    *pos = Position::new(discard, pos.offset - keep_len);
                } else if pos.node == parent && pos.offset >= discard_index {
                    pos.offset += 1;
                }
            }
            RangeChange::MoveNode {
                old_parent,
                old_index,
                new_parent,
                new_index,
            } => {
                if pos.node == old_parent && pos.offset > old_index {
                    pos.offset -= 1;
                }
                if pos.node == new_parent && pos.offset >= new_index {
                    pos.offset += 1;
                }
            }
            RangeChange::InsertText { node, offset, len } => {
                if pos.node == node && pos.offset >= offset {
                    pos.offset += len;
                }
            }
            RangeChange::DeleteText { node, offset, len } => {
                if pos.node == node && pos.offset > offset {
                    pos.offset = pos.offset.saturating_sub(len).max(offset);
                }
            }
        }
    }

    /// Adjust every position of a snapshot in place
    pub fn apply_to<T: TreeProvider + ?Sized>(&self, selection: &mut SelectionState, tree: &T) {
        let removed_subtree = |node: NodeId| match *self {
            RangeChange::DeleteNode { removed, .. } => tree.is_inclusive_ancestor(removed, node),
            _ => false,
        };
        for pos in selection.positions_mut() {
            self.apply(pos, &removed_subtree);
        }
    }
}

/// Registry of live snapshots
#[derive(Debug, Default)]
pub struct RangeTracker {
    entries: BTreeMap<TrackerId, SelectionState>,
    next_id: u64,
}

impl RangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start keeping `selection` valid across edits
    pub fn register(&mut self, selection: SelectionState) -> TrackerId {
        let id = TrackerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, selection);
        id
    }

    /// Stop tracking and hand back the adjusted snapshot
    pub fn unregister(&mut self, id: TrackerId) -> Option<SelectionState> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: TrackerId) -> Option<&SelectionState> {
        self.entries.get(&id)
    }

    /// Overwrite a registered snapshot; returns false for unknown ids
    pub fn replace(&mut self, id: TrackerId, selection: SelectionState) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                *entry = selection;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply one change to every registered snapshot
    pub fn adjust<T: TreeProvider + ?Sized>(&mut self, change: &RangeChange, tree: &T) {
        trace!(?change, tracked = self.entries.len(), "adjusting tracked ranges");
        for selection in self.entries.values_mut() {
            change.apply_to(selection, tree);
        }
    }

    fn adjust_without_removal(&mut self, change: RangeChange) {
        trace!(?change, tracked = self.entries.len(), "adjusting tracked ranges");
        for selection in self.entries.values_mut() {
            for pos in selection.positions_mut() {
                change.apply(pos, &|_| false);
            }
        }
    }

    pub fn did_insert_node(&mut self, parent: NodeId, index: usize) {
        self.adjust_without_removal(RangeChange::InsertNode { parent, index });
    }

    /// `tree` must already reflect the removal
    pub fn did_delete_node<T: TreeProvider + ?Sized>(
        &mut self,
        tree: &T,
        parent: NodeId,
        index: usize,
        removed: NodeId,
    ) {
        self.adjust(
            &RangeChange::DeleteNode {
                parent,
                index,
                removed,
            },
            tree,
        );
    }

    pub fn did_split_node(
        &mut self,
        node: NodeId,
        offset: usize,
        left: NodeId,
        parent: NodeId,
        left_index: usize,
    ) {
        self.adjust_without_removal(RangeChange::SplitNode {
            node,
            offset,
            left,
            parent,
            left_index,
        });
    }

    pub fn did_unsplit_node(
        &mut self,
        left: NodeId,
        left_len: usize,
        node: NodeId,
        parent: NodeId,
        left_index: usize,
    ) {
        self.adjust_without_removal(RangeChange::UnsplitNode {
            left,
            left_len,
            node,
            parent,
            left_index,
        });
    }

    pub fn did_join_nodes(
        &mut self,
        keep: NodeId,
        keep_len: usize,
        discard: NodeId,
        parent: NodeId,
        discard_index: usize,
    ) {
        self.adjust_without_removal(RangeChange::JoinNodes {
            keep,
            keep_len,
            discard,
            parent,
            discard_index,
        });
    }

    pub fn did_unjoin_nodes(
        &mut self,
        keep: NodeId,
        keep_len: usize,
        discard: NodeId,
        parent: NodeId,
        discard_index: usize,
    ) {
        self.adjust_without_removal(RangeChange::UnjoinNodes {
            keep,
            keep_len,
            discard,
            parent,
            discard_index,
        });
    }

    pub fn did_move_node(
        &mut self,
        old_parent: NodeId,
        old_index: usize,
        new_parent: NodeId,
        new_index: usize,
    ) {
        self.adjust_without_removal(RangeChange::MoveNode {
            old_parent,
            old_index,
            new_parent,
            new_index,
        });
    }

    pub fn did_insert_text(&mut self, node: NodeId, offset: usize, len: usize) {
        self.adjust_without_removal(RangeChange::InsertText { node, offset, len });
    }

    pub fn did_delete_text(&mut self, node: NodeId, offset: usize, len: usize) {
        self.adjust_without_removal(RangeChange::DeleteText { node, offset, len });
    }
}
