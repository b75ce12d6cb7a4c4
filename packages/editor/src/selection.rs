//! Positions and selection snapshots.
//!
//! A [`SelectionState`] is a value: once captured it is independent of the
//! live selection. Keeping one meaningful across edits means registering it
//! with the [`RangeTracker`](crate::RangeTracker).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tree::NodeId;

/// A `(node, offset)` endpoint
///
/// The offset is a child index for containers and a character index for
/// text nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.node, self.offset)
    }
}

/// One selected range; anchor and focus may be in either order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub anchor: Position,
    pub focus: Position,
}

impl SelectionRange {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Ordered snapshot of selection ranges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionState {
    ranges: Vec<SelectionRange>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single caret
    pub fn collapsed(at: Position) -> Self {
        Self {
            ranges: vec![SelectionRange::caret(at)],
        }
    }

    pub fn range(anchor: Position, focus: Position) -> Self {
        Self {
            ranges: vec![SelectionRange::new(anchor, focus)],
        }
    }

    pub fn from_ranges(ranges: Vec<SelectionRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[SelectionRange] {
        &self.ranges
    }

    pub fn push(&mut self, range: SelectionRange) {
        self.ranges.push(range);
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Drops every range (the explicitly cleared state)
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// First range's focus, if any
    pub fn focus(&self) -> Option<Position> {
        self.ranges.first().map(|r| r.focus)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.ranges.iter().flat_map(|r| [&r.anchor, &r.focus])
    }

    pub fn positions_mut(&mut self) -> impl Iterator<Item = &mut Position> {
        self.ranges
            .iter_mut()
            .flat_map(|r| [&mut r.anchor, &mut r.focus])
    }
}
