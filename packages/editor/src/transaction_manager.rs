//! # Transaction Manager
//!
//! Owns the undo and redo stacks.
//!
//! ## Design
//!
//! - Each entry is a [`Transaction`], usually a placeholder batch
//! - A new entry first offers itself to the top entry for merging
//! - New non-transient entries clear the redo stack
//! - Transient entries run but are never recorded and leave redo intact
//! - The oldest entries are evicted once the history limit is exceeded
//! - Undo and redo fix the entry that ends up on top, so later edits start
//!   a fresh undo step
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = TransactionManager::new();
//! history.do_transaction(Transaction::insert_text(text, 0, "Hi"), &mut ctx)?;
//! history.undo(1, &mut ctx)?;
//! history.redo(1, &mut ctx)?;
//! ```

use tracing::{debug, trace};

use crate::errors::EditorError;
use crate::placeholder::{BatchId, PlaceholderBatch};
use crate::transaction::{EditContext, Transaction};

/// Where a committed entry ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// New undo entry
    Pushed,
    /// Spliced into the previous entry
    Merged,
    /// Held by an open manager-level batch
    Grouped,
    /// Ran but is never recorded
    Transient,
    /// Not recorded because history is disabled
    Discarded,
}

/// Undo/redo history for one editor
#[derive(Debug)]
pub struct TransactionManager {
    /// Applied entries (most recent last)
    undo_stack: Vec<Transaction>,

    /// Undone entries (most recent last)
    redo_stack: Vec<Transaction>,

    /// Maximum number of undo entries (`None` = unbounded, 0 = disabled)
    max_levels: Option<usize>,

    /// Nesting depth of `begin_batch`
    batch_depth: usize,

    /// Children collected while a manager-level batch is open
    current_batch: Vec<Transaction>,
}

impl TransactionManager {
    /// Create an unbounded manager
    pub fn new() -> Self {
        Self::with_history_limit(-1)
    }

    /// Create a manager with a history limit (negative = unbounded)
    pub fn with_history_limit(limit: i64) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels: usize::try_from(limit).ok(),
            batch_depth: 0,
            current_batch: Vec::new(),
        }
    }

    /// Execute a transaction and record it
    pub fn do_transaction(
        &mut self,
        mut txn: Transaction,
        ctx: &mut EditContext<'_>,
    ) -> Result<Commit, EditorError> {
        txn.do_transaction(ctx)?;
        Ok(self.push(txn))
    }

    /// Record an already executed transaction
    pub fn push(&mut self, txn: Transaction) -> Commit {
        if self.batch_depth > 0 {
            trace!(txn = txn.label(), "grouping into open batch");
            self.current_batch.push(txn);
            return Commit::Grouped;
        }
        if txn.is_transient() {
            trace!(txn = txn.label(), "transient transaction not recorded");
            return Commit::Transient;
        }

        if !self.redo_stack.is_empty() {
            trace!(discarded = self.redo_stack.len(), "clearing redo stack");
            self.redo_stack.clear();
        }
        if self.max_levels == Some(0) {
            return Commit::Discarded;
        }

        let txn = match self.undo_stack.last_mut() {
            Some(top) => match top.try_merge(txn) {
                Ok(()) => {
                    trace!(depth = self.undo_stack.len(), "merged into top entry");
                    return Commit::Merged;
                }
                Err(txn) => txn,
            },
            None => txn,
        };

        trace!(txn = txn.label(), depth = self.undo_stack.len() + 1, "pushing undo entry");
        self.undo_stack.push(txn);
        self.evict();
        Commit::Pushed
    }

    /// Undo up to `count` entries; returns how many moved
    ///
    /// Stops at the first failure. Entries already moved stay on the redo
    /// stack and the failing one stays on the undo stack.
    pub fn undo(&mut self, count: usize, ctx: &mut EditContext<'_>) -> Result<usize, EditorError> {
        if self.batch_depth > 0 {
            return Err(EditorError::BatchOpen);
        }
        if self.undo_stack.is_empty() {
            return Err(EditorError::UndoUnavailable);
        }

        let mut moved = 0;
        while moved < count {
            let Some(mut txn) = self.undo_stack.pop() else {
                break;
            };
            if let Err(source) = txn.undo_transaction(ctx) {
                self.undo_stack.push(txn);
                self.fix_top();
                return Err(EditorError::HistoryInterrupted {
                    completed: moved,
                    requested: count,
                    source,
                });
            }
            self.redo_stack.push(txn);
            moved += 1;
        }

        debug!(moved, remaining = self.undo_stack.len(), "undo");
        self.fix_top();
        Ok(moved)
    }

    /// Redo up to `count` entries; returns how many moved
    pub fn redo(&mut self, count: usize, ctx: &mut EditContext<'_>) -> Result<usize, EditorError> {
        if self.batch_depth > 0 {
            return Err(EditorError::BatchOpen);
        }
        if self.redo_stack.is_empty() {
            return Err(EditorError::RedoUnavailable);
        }

        let mut moved = 0;
        while moved < count {
            let Some(mut txn) = self.redo_stack.pop() else {
                break;
            };
            if let Err(source) = txn.redo_transaction(ctx) {
                self.redo_stack.push(txn);
                self.fix_top();
                return Err(EditorError::HistoryInterrupted {
                    completed: moved,
                    requested: count,
                    source,
                });
            }
            self.undo_stack.push(txn);
            moved += 1;
        }

        debug!(moved, remaining = self.redo_stack.len(), "redo");
        self.fix_top();
        Ok(moved)
    }

    /// Start grouping committed entries into a single undo step
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close one level of grouping; the outermost close records the group
    pub fn end_batch(&mut self) -> Result<Option<Commit>, EditorError> {
        if self.batch_depth == 0 {
            return Err(EditorError::BatchNotOpen);
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 || self.current_batch.is_empty() {
            return Ok(None);
        }
        let children = std::mem::take(&mut self.current_batch);
        Ok(Some(self.push(Transaction::aggregate(children))))
    }

    /// Check if a manager-level batch is open
    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Change the history limit (negative = unbounded, 0 = disabled)
    ///
    /// Shrinking evicts the oldest entries immediately.
    pub fn set_history_limit(&mut self, limit: i64) {
        self.max_levels = usize::try_from(limit).ok();
        if self.max_levels == Some(0) {
            self.undo_stack.clear();
            self.redo_stack.clear();
        }
        self.evict();
    }

    /// Current history limit (`None` = unbounded)
    pub fn history_limit(&self) -> Option<usize> {
        self.max_levels
    }

    /// Fix the top undo entry; returns whether there was one to fix
    pub fn mark_top_fixed(&mut self) -> bool {
        match self.undo_stack.last_mut() {
            Some(top) => {
                if let Some(batch) = top.as_placeholder_mut() {
                    batch.mark_fixed();
                }
                true
            }
            None => false,
        }
    }

    /// Find a recorded placeholder batch by id
    pub fn find_batch_mut(&mut self, id: BatchId) -> Option<&mut PlaceholderBatch> {
        self.undo_stack
            .iter_mut()
            .chain(self.redo_stack.iter_mut())
            .filter_map(Transaction::as_placeholder_mut)
            .find(|batch| batch.id() == id)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of undo entries available
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo entries available
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// The entry the next undo would revert
    pub fn peek_undo(&self) -> Option<&Transaction> {
        self.undo_stack.last()
    }

    /// The entry the next redo would replay
    pub fn peek_redo(&self) -> Option<&Transaction> {
        self.redo_stack.last()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch.clear();
        self.batch_depth = 0;
    }

    fn fix_top(&mut self) {
        self.mark_top_fixed();
    }

    fn evict(&mut self) {
        if let Some(max) = self.max_levels {
            if self.undo_stack.len() > max {
                let excess = self.undo_stack.len() - max;
                trace!(excess, "evicting oldest undo entries");
                self.undo_stack.drain(..excess);
            }
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
