//! Placeholder batches: the undo-stack entry for one user-visible action.
//!
//! A batch remembers the selection before its first child ran and after its
//! last, so undo and redo put the caret back where the user saw it. Batches
//! with the same name coalesce into the entry below them until that entry
//! is fixed.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use crate::selection::{SelectionRange, SelectionState};
use crate::transaction::{run_backward, run_forward, EditContext, Transaction};
use crate::tree::{SelectionProvider, TreeError, TreeProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

#[derive(Debug)]
pub struct PlaceholderBatch {
    id: BatchId,
    name: Option<String>,
    children: Vec<Transaction>,
    start_selection: SelectionState,
    end_selection: Option<SelectionState>,
    fixed: bool,
}

impl PlaceholderBatch {
    pub fn new(id: BatchId, name: Option<String>, start_selection: SelectionState) -> Self {
        Self {
            id,
            name,
            children: Vec::new(),
            start_selection,
            end_selection: None,
            fixed: false,
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn children(&self) -> &[Transaction] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Refuse any further merge into this batch
    pub fn mark_fixed(&mut self) {
        self.fixed = true;
    }

    pub fn start_selection(&self) -> &SelectionState {
        &self.start_selection
    }

    pub fn end_selection(&self) -> Option<&SelectionState> {
        self.end_selection.as_ref()
    }

    pub fn is_transient(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(Transaction::is_transient)
    }

    /// Append an already executed child
    pub fn push_child(&mut self, txn: Transaction) {
        self.children.push(txn);
    }

    pub fn set_end_selection(&mut self, selection: SelectionState) {
        self.end_selection = Some(selection);
    }

    pub(crate) fn do_children(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        run_forward(&mut self.children, ctx, false)?;
        self.end_selection = Some(ctx.host.current_selection());
        Ok(())
    }

    pub(crate) fn undo(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        run_backward(&mut self.children, ctx)?;
        restore_selection(ctx, &self.start_selection);
        Ok(())
    }

    pub(crate) fn redo(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        run_forward(&mut self.children, ctx, true)?;
        if let Some(end) = &self.end_selection {
            restore_selection(ctx, end);
        }
        Ok(())
    }

    /// Splice `next` onto this batch when both carry the same name and this
    /// one is not fixed; otherwise hand `next` back
    pub(crate) fn absorb(&mut self, next: PlaceholderBatch) -> Result<(), PlaceholderBatch> {
        let compatible = !self.fixed && next.name.is_some() && self.name == next.name;
        if !compatible {
            return Err(next);
        }
        trace!(
            into = %self.id,
            from = %next.id,
            children = next.children.len(),
            "merging placeholder batch"
        );
        self.children.extend(next.children);
        if next.end_selection.is_some() {
            self.end_selection = next.end_selection;
        }
        self.fixed = next.fixed;
        Ok(())
    }
}

/// Manager-level grouping: children run together, never merge
#[derive(Debug, Default)]
pub struct AggregateTransaction {
    children: Vec<Transaction>,
}

impl AggregateTransaction {
    pub fn new(children: Vec<Transaction>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[Transaction] {
        &self.children
    }

    pub fn is_transient(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(Transaction::is_transient)
    }

    pub(crate) fn do_children(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        run_forward(&mut self.children, ctx, false)
    }

    pub(crate) fn undo(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        run_backward(&mut self.children, ctx)
    }

    pub(crate) fn redo(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        run_forward(&mut self.children, ctx, true)
    }
}

/// Put a recorded selection back, dropping ranges whose nodes were detached
/// since it was captured (e.g. by a transient edit). If nothing survives, the
/// live selection is left as the range adjustments already placed it.
fn restore_selection(ctx: &mut EditContext<'_>, recorded: &SelectionState) {
    let tree = &*ctx.host;
    let ranges: Vec<SelectionRange> = recorded
        .ranges()
        .iter()
        .filter(|range| tree.is_attached(range.anchor.node) && tree.is_attached(range.focus.node))
        .map(|range| {
            let mut range = *range;
            for pos in [&mut range.anchor, &mut range.focus] {
                pos.offset = pos.offset.min(tree.content_len(pos.node));
            }
            range
        })
        .collect();

    if ranges.is_empty() && !recorded.is_empty() {
        debug!("recorded selection no longer attached, keeping live selection");
        return;
    }
    ctx.host.set_selection(SelectionState::from_ranges(ranges));
}
