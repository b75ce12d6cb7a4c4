//! # Editor
//!
//! Entry point for edits against a [`Host`].
//!
//! ## Edit flow
//!
//! 1. Check preconditions (a violation changes nothing and notifies no one)
//! 2. `will_mutate` listeners
//! 3. Build and run the leaf transaction
//! 4. Inside an open placeholder window the leaf joins the window's batch;
//!    otherwise it is wrapped in an anonymous batch and committed
//! 5. `did_mutate` listeners, then `edit_committed` for a standalone edit
//!
//! Undo and redo are refused while a placeholder window is open.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::{debug, trace, warn};

use crate::config::{EditorConfig, EmptyTextInsert};
use crate::errors::{EditorError, ListenerError};
use crate::listener::{EditListener, ListenerId};
use crate::modification::ModificationTracker;
use crate::mutations::EditOp;
use crate::placeholder::{BatchId, PlaceholderBatch};
use crate::range_tracker::{RangeTracker, TrackerId};
use crate::selection::SelectionState;
use crate::snapshot::NodeSnapshot;
use crate::transaction::{EditContext, EditOutput, Transaction};
use crate::transaction_manager::{Commit, TransactionManager};
use crate::tree::{Host, NodeId, SelectionProvider, TreeError};

/// An open placeholder window
struct Window {
    id: BatchId,
    name: Option<String>,
    depth: usize,
    start_selection: SelectionState,
    tracked: TrackerId,
    batch: Option<PlaceholderBatch>,
    fixed: bool,
}

/// Undoable editing over a host document.
///
/// Owns the host, the range tracker and (unless undo is disabled) the undo
/// history. Every edit goes through here so listeners, selections and the
/// dirty state stay consistent with the tree.
pub struct Editor<H: Host> {
    host: H,
    ranges: RangeTracker,
    history: Option<TransactionManager>,
    modifications: ModificationTracker,
    config: EditorConfig,
    window: Option<Window>,
    listeners: Vec<(ListenerId, Rc<dyn EditListener<H>>)>,
    next_listener: u64,
    next_batch: u64,
    transient_depth: usize,
}

fn unexpected(output: EditOutput) -> EditorError {
    EditorError::Transaction(TreeError::Rejected(format!(
        "unexpected edit output {:?}",
        output
    )))
}

impl<H: Host> Editor<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, EditorConfig::default())
    }

    pub fn with_config(host: H, config: EditorConfig) -> Self {
        let history = config
            .undo_enabled
            .then(|| TransactionManager::with_history_limit(config.history_limit));
        Self {
            host,
            ranges: RangeTracker::new(),
            history,
            modifications: ModificationTracker::new(),
            config,
            window: None,
            listeners: Vec::new(),
            next_listener: 0,
            next_batch: 0,
            transient_depth: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct access to the host; changes made here bypass history and
    /// range tracking
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn snapshot(&self, node: NodeId) -> NodeSnapshot {
        NodeSnapshot::capture(&self.host, node)
    }

    // ---- Selection ----

    pub fn selection(&self) -> SelectionState {
        self.host.current_selection()
    }

    pub fn set_selection(&mut self, selection: SelectionState) {
        self.host.set_selection(selection);
    }

    pub fn ranges(&self) -> &RangeTracker {
        &self.ranges
    }

    /// Keep a selection snapshot valid across later edits
    pub fn register_selection(&mut self, selection: SelectionState) -> TrackerId {
        self.ranges.register(selection)
    }

    pub fn unregister_selection(&mut self, id: TrackerId) -> Option<SelectionState> {
        self.ranges.unregister(id)
    }

    pub fn tracked_selection(&self, id: TrackerId) -> Option<&SelectionState> {
        self.ranges.get(id)
    }

    /// Selection captured when the open placeholder window began, as
    /// adjusted by the edits since
    pub fn placeholder_selection(&self) -> Option<&SelectionState> {
        self.window.as_ref().and_then(|w| self.ranges.get(w.tracked))
    }

    // ---- Listeners ----

    pub fn add_listener(&mut self, listener: Rc<dyn EditListener<H>>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Call every listener registered at the time of the call. Listeners
    /// added or removed by a callback take effect from the next notification.
    fn notify<F>(&mut self, callback: &'static str, mut f: F)
    where
        F: FnMut(&dyn EditListener<H>, &mut Self) -> Result<(), ListenerError>,
    {
        if self.listeners.is_empty() {
            return;
        }
        let listeners: Vec<Rc<dyn EditListener<H>>> =
            self.listeners.iter().map(|(_, l)| Rc::clone(l)).collect();
        for listener in listeners {
            if let Err(err) = f(listener.as_ref(), self) {
                warn!(callback, error = %err, "listener failed");
            }
        }
    }

    fn notify_state(&mut self, change: Option<bool>) {
        if let Some(is_dirty) = change {
            self.notify("document_state_changed", |listener, editor| {
                listener.document_state_changed(editor, is_dirty)
            });
        }
    }

    // ---- Configuration ----

    /// Negative = unbounded, 0 = nothing undoable. Shrinking evicts the
    /// oldest entries immediately.
    pub fn set_history_limit(&mut self, limit: i64) {
        self.config.history_limit = limit;
        if let Some(history) = self.history.as_mut() {
            history.set_history_limit(limit);
            if limit == 0 && self.modifications.count() < 0 {
                let change = self.modifications.lose_clean_point();
                self.notify_state(change);
            }
        }
    }

    pub fn history_limit(&self) -> i64 {
        self.config.history_limit
    }

    /// Disabling drops both stacks
    pub fn enable_undo(&mut self, enabled: bool) {
        self.config.undo_enabled = enabled;
        if enabled {
            if self.history.is_none() {
                self.history = Some(TransactionManager::with_history_limit(
                    self.config.history_limit,
                ));
            }
        } else if self.history.take().is_some() && self.modifications.count() != 0 {
            let change = self.modifications.lose_clean_point();
            self.notify_state(change);
        }
    }

    pub fn set_should_transactions_set_selection(&mut self, enabled: bool) {
        self.config.transactions_set_selection = enabled;
    }

    // ---- History ----

    pub fn can_undo(&self) -> bool {
        self.history.as_ref().map_or(false, TransactionManager::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.history.as_ref().map_or(false, TransactionManager::can_redo)
    }

    pub fn undo_len(&self) -> usize {
        self.history.as_ref().map_or(0, TransactionManager::undo_len)
    }

    pub fn redo_len(&self) -> usize {
        self.history.as_ref().map_or(0, TransactionManager::redo_len)
    }

    pub fn history(&self) -> Option<&TransactionManager> {
        self.history.as_ref()
    }

    pub fn undo(&mut self, count: usize) -> Result<usize, EditorError> {
        if self.window.is_some() {
            return Err(EditorError::BatchOpen);
        }
        let Some(history) = self.history.as_mut() else {
            return Err(EditorError::UndoUnavailable);
        };
        let mut ctx = EditContext::new(&mut self.host, &mut self.ranges, false);
        let result = history.undo(count, &mut ctx);
        self.history_moved(&result, -1);
        result
    }

    pub fn redo(&mut self, count: usize) -> Result<usize, EditorError> {
        if self.window.is_some() {
            return Err(EditorError::BatchOpen);
        }
        let Some(history) = self.history.as_mut() else {
            return Err(EditorError::RedoUnavailable);
        };
        let mut ctx = EditContext::new(&mut self.host, &mut self.ranges, false);
        let result = history.redo(count, &mut ctx);
        self.history_moved(&result, 1);
        result
    }

    fn history_moved(&mut self, result: &Result<usize, EditorError>, sign: i64) {
        let moved = match result {
            Ok(moved) => *moved,
            Err(EditorError::HistoryInterrupted { completed, .. }) => *completed,
            Err(_) => 0,
        };
        if moved > 0 {
            let change = self.modifications.record(sign * moved as i64);
            self.notify_state(change);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.modifications.is_dirty()
    }

    pub fn modification_count(&self) -> i64 {
        self.modifications.count()
    }

    /// The current state becomes the clean point; the top entry stops
    /// accepting merges
    pub fn mark_clean(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.mark_top_fixed();
        }
        let change = self.modifications.mark_clean();
        self.notify_state(change);
    }

    // ---- Batching ----

    /// Open a named placeholder window. Nested calls join the outer window
    /// and return its id.
    pub fn begin_placeholder(&mut self, name: &str) -> BatchId {
        self.open_window(Some(name.to_string()))
    }

    /// Open an unnamed window; its batch never merges
    pub fn begin_anonymous_placeholder(&mut self) -> BatchId {
        self.open_window(None)
    }

    fn open_window(&mut self, name: Option<String>) -> BatchId {
        if let Some(window) = self.window.as_mut() {
            window.depth += 1;
            trace!(batch = %window.id, depth = window.depth, "placeholder nested");
            return window.id;
        }
        let id = self.allocate_batch_id();
        let start_selection = self.host.current_selection();
        let tracked = self.ranges.register(start_selection.clone());
        debug!(batch = %id, name = ?name, "placeholder opened");
        self.window = Some(Window {
            id,
            name,
            depth: 1,
            start_selection,
            tracked,
            batch: None,
            fixed: false,
        });
        id
    }

    pub fn end_placeholder(&mut self) -> Result<(), EditorError> {
        let depth = match self.window.as_mut() {
            Some(window) => {
                window.depth -= 1;
                window.depth
            }
            None => return Err(EditorError::BatchNotOpen),
        };
        if depth > 0 {
            return Ok(());
        }
        let Some(window) = self.window.take() else {
            return Err(EditorError::BatchNotOpen);
        };

        let tracked = self.ranges.unregister(window.tracked).unwrap_or_default();
        let mut live = self.host.current_selection();
        if live.is_empty() && !tracked.is_empty() {
            live = tracked;
            self.host.set_selection(live.clone());
        }

        let Some(mut batch) = window.batch else {
            debug!(batch = %window.id, "placeholder closed empty");
            return Ok(());
        };
        if window.fixed {
            batch.mark_fixed();
        }
        batch.set_end_selection(live);
        debug!(batch = %window.id, children = batch.len(), "placeholder closed");
        let commit = self.commit(Transaction::placeholder(batch));
        if commit != Commit::Grouped {
            self.notify("edit_committed", |listener, editor| listener.edit_committed(editor));
        }
        Ok(())
    }

    pub fn is_batching(&self) -> bool {
        self.window.is_some()
    }

    pub fn batch_depth(&self) -> usize {
        self.window.as_ref().map_or(0, |w| w.depth)
    }

    /// Stop a batch from absorbing later same-named batches
    pub fn mark_fixed(&mut self, id: BatchId) -> Result<(), EditorError> {
        if let Some(window) = self.window.as_mut() {
            if window.id == id {
                window.fixed = true;
                return Ok(());
            }
        }
        match self.history.as_mut().and_then(|h| h.find_batch_mut(id)) {
            Some(batch) => {
                batch.mark_fixed();
                Ok(())
            }
            None => Err(EditorError::UnknownBatch(id)),
        }
    }

    pub fn mark_top_fixed(&mut self) -> bool {
        self.history
            .as_mut()
            .map_or(false, TransactionManager::mark_top_fixed)
    }

    /// Group every commit until the matching `end_batch` into one undo
    /// step. No-op while undo is disabled.
    pub fn begin_batch(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.begin_batch();
        }
    }

    pub fn end_batch(&mut self) -> Result<(), EditorError> {
        let Some(history) = self.history.as_mut() else {
            return Ok(());
        };
        let had_redo = history.can_redo();
        if let Some(commit) = history.end_batch()? {
            self.after_commit(had_redo, commit);
            self.notify("edit_committed", |listener, editor| listener.edit_committed(editor));
        }
        Ok(())
    }

    /// Run `f` with every edit it makes excluded from history and dirty
    /// tracking
    pub fn transient<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let depth = self.transient_depth;
        self.transient_depth += 1;
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        // restored on unwind too, so later edits are recorded again
        self.transient_depth = depth;
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn allocate_batch_id(&mut self) -> BatchId {
        self.next_batch += 1;
        BatchId(self.next_batch)
    }

    // ---- Edits ----

    pub fn insert_node(&mut self, parent: NodeId, index: usize, node: NodeId) -> Result<(), EditorError> {
        self.apply(EditOp::InsertNode {
            parent,
            index,
            node,
        })
        .map(|_| ())
    }

    /// Returns the removed node
    pub fn delete_node(&mut self, parent: NodeId, index: usize) -> Result<NodeId, EditorError> {
        match self.apply(EditOp::DeleteNode { parent, index })? {
            EditOutput::Node(node) => Ok(node),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the new left sibling
    pub fn split_node(&mut self, node: NodeId, offset: usize) -> Result<NodeId, EditorError> {
        match self.apply(EditOp::SplitNode { node, offset })? {
            EditOutput::Node(left) => Ok(left),
            other => Err(unexpected(other)),
        }
    }

    pub fn join_nodes(&mut self, keep: NodeId, discard: NodeId) -> Result<(), EditorError> {
        self.apply(EditOp::JoinNodes { keep, discard }).map(|_| ())
    }

    pub fn move_node(&mut self, node: NodeId, new_parent: NodeId, index: usize) -> Result<(), EditorError> {
        self.apply(EditOp::MoveNode {
            node,
            new_parent,
            index,
        })
        .map(|_| ())
    }

    pub fn insert_text(&mut self, node: NodeId, offset: usize, text: &str) -> Result<(), EditorError> {
        self.apply(EditOp::InsertText {
            node,
            offset,
            text: text.to_string(),
        })
        .map(|_| ())
    }

    /// Returns the removed characters
    pub fn delete_text(&mut self, node: NodeId, offset: usize, len: usize) -> Result<String, EditorError> {
        match self.apply(EditOp::DeleteText { node, offset, len })? {
            EditOutput::Text(removed) => Ok(removed),
            other => Err(unexpected(other)),
        }
    }

    /// Perform one edit
    pub fn apply(&mut self, op: EditOp) -> Result<EditOutput, EditorError> {
        if let EditOp::InsertText { text, .. } = &op {
            if text.is_empty() && self.config.empty_text_insert == EmptyTextInsert::Ignore {
                trace!("ignoring empty text insert");
                return Ok(EditOutput::Skipped);
            }
        }

        op.validate(&self.host)?;
        let kind = op.notification_kind(&self.host);
        debug!(kind = %kind, "applying edit");

        self.notify("will_mutate", |listener, editor| {
            listener.will_mutate(editor, kind, &op)
        });

        let result = self.execute(&op);
        let reported = result.as_ref().map(|(output, _)| output);
        self.notify("did_mutate", |listener, editor| {
            listener.did_mutate(editor, kind, &op, reported)
        });

        let (output, committed) = result?;
        if committed {
            self.notify("edit_committed", |listener, editor| listener.edit_committed(editor));
        }
        Ok(output)
    }

    /// Run an edit; the flag says whether it was committed on its own
    fn execute(&mut self, op: &EditOp) -> Result<(EditOutput, bool), EditorError> {
        // listeners may have changed the tree since the first check
        op.validate(&self.host)?;

        let mut txn = op.to_transaction();
        if self.transient_depth > 0 {
            txn = txn.with_transient(true);
        }
        let start_selection = self.host.current_selection();
        let mut ctx = EditContext::new(
            &mut self.host,
            &mut self.ranges,
            self.config.transactions_set_selection,
        );
        txn.do_transaction(&mut ctx)?;
        let output = txn.output();

        if self.window.is_some() {
            self.append_to_window(txn);
            return Ok((output, false));
        }

        let mut batch = PlaceholderBatch::new(self.allocate_batch_id(), None, start_selection);
        batch.push_child(txn);
        batch.set_end_selection(self.host.current_selection());
        let commit = self.commit(Transaction::placeholder(batch));
        Ok((output, commit != Commit::Grouped))
    }

    /// Run a prebuilt transaction as a single edit. No mutation listeners
    /// are notified; `edit_committed` is.
    pub fn do_transaction(&mut self, mut txn: Transaction) -> Result<(), EditorError> {
        if self.transient_depth > 0 {
            txn = txn.with_transient(true);
        }
        let had_redo = self.can_redo();
        let transient = txn.is_transient();
        let mut ctx = EditContext::new(
            &mut self.host,
            &mut self.ranges,
            self.config.transactions_set_selection,
        );
        if self.window.is_some() {
            txn.do_transaction(&mut ctx)?;
            self.append_to_window(txn);
            return Ok(());
        }

        let commit = match self.history.as_mut() {
            Some(history) => history.do_transaction(txn, &mut ctx)?,
            None => {
                txn.do_transaction(&mut ctx)?;
                if transient {
                    Commit::Transient
                } else {
                    Commit::Discarded
                }
            }
        };
        self.after_commit(had_redo, commit);
        if commit != Commit::Grouped {
            self.notify("edit_committed", |listener, editor| listener.edit_committed(editor));
        }
        Ok(())
    }

    fn append_to_window(&mut self, txn: Transaction) {
        if let Some(window) = self.window.as_mut() {
            let batch = window.batch.get_or_insert_with(|| {
                PlaceholderBatch::new(window.id, window.name.clone(), window.start_selection.clone())
            });
            trace!(batch = %window.id, txn = txn.label(), "appending to open placeholder");
            batch.push_child(txn);
        }
    }

    /// Hand an executed entry to the history and update dirty tracking
    fn commit(&mut self, entry: Transaction) -> Commit {
        let had_redo = self.can_redo();
        let commit = match self.history.as_mut() {
            Some(history) => history.push(entry),
            None if entry.is_transient() => Commit::Transient,
            None => Commit::Discarded,
        };
        self.after_commit(had_redo, commit);
        commit
    }

    fn after_commit(&mut self, had_redo: bool, commit: Commit) {
        let clears_redo = matches!(commit, Commit::Pushed | Commit::Merged | Commit::Discarded);
        if had_redo && clears_redo && self.modifications.count() < 0 {
            let change = self.modifications.lose_clean_point();
            self.notify_state(change);
        }
        if matches!(commit, Commit::Pushed | Commit::Discarded) {
            let change = self.modifications.record(1);
            self.notify_state(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryTree, NodeSpec};
    use crate::selection::Position;
    use crate::tree::TreeProvider;

    /// body#0 > p#1 > "Hello"#2
    fn editor() -> Editor<MemoryTree> {
        Editor::new(MemoryTree::from_spec(&NodeSpec::element(
            "body",
            vec![NodeSpec::element("p", vec![NodeSpec::text("Hello")])],
        )))
    }

    fn markup(editor: &Editor<MemoryTree>) -> String {
        editor.snapshot(editor.host().root()).to_markup()
    }

    #[test]
    fn test_typed_edits_return_outputs() {
        let mut ed = editor();
        let left = ed.split_node(NodeId(2), 2).unwrap();
        assert_eq!(ed.host().text(left).as_deref(), Some("He"));
        assert_eq!(ed.delete_text(NodeId(2), 0, 1).unwrap(), "l");
        assert_eq!(ed.delete_node(NodeId(1), 0).unwrap(), left);
        assert_eq!(markup(&ed), "<body><p>lo</p></body>");
    }

    #[test]
    fn test_precondition_failure_records_nothing() {
        let mut ed = editor();
        let err = ed.insert_text(NodeId(2), 9, "x").unwrap_err();
        assert!(matches!(err, EditorError::Precondition(_)));
        assert!(!ed.can_undo());
        assert!(!ed.is_dirty());
    }

    #[test]
    fn test_empty_insert_is_ignored_by_default() {
        let mut ed = editor();
        assert_eq!(
            ed.apply(EditOp::InsertText {
                node: NodeId(2),
                offset: 0,
                text: String::new(),
            })
            .unwrap(),
            EditOutput::Skipped
        );
        assert!(!ed.can_undo());

        ed.config.empty_text_insert = EmptyTextInsert::Record;
        ed.insert_text(NodeId(2), 0, "").unwrap();
        assert_eq!(ed.undo_len(), 1);
    }

    #[test]
    fn test_undo_refused_while_window_open() {
        let mut ed = editor();
        ed.insert_text(NodeId(2), 5, "!").unwrap();
        ed.begin_placeholder("typing");
        assert_eq!(ed.undo(1), Err(EditorError::BatchOpen));
        ed.end_placeholder().unwrap();
        assert_eq!(ed.undo(1), Ok(1));
    }

    #[test]
    fn test_end_without_begin() {
        let mut ed = editor();
        assert_eq!(ed.end_placeholder(), Err(EditorError::BatchNotOpen));
    }

    #[test]
    fn test_nested_windows_share_one_batch() {
        let mut ed = editor();
        let outer = ed.begin_placeholder("outer");
        let inner = ed.begin_placeholder("inner");
        assert_eq!(outer, inner);
        assert_eq!(ed.batch_depth(), 2);
        ed.insert_text(NodeId(2), 0, "a").unwrap();
        ed.end_placeholder().unwrap();
        ed.insert_text(NodeId(2), 0, "b").unwrap();
        ed.end_placeholder().unwrap();
        assert!(!ed.is_batching());
        assert_eq!(ed.undo_len(), 1);

        ed.undo(1).unwrap();
        assert_eq!(markup(&ed), "<body><p>Hello</p></body>");
    }

    #[test]
    fn test_empty_window_commits_nothing() {
        let mut ed = editor();
        ed.begin_placeholder("typing");
        ed.end_placeholder().unwrap();
        assert!(!ed.can_undo());
        assert!(!ed.is_dirty());
    }

    #[test]
    fn test_placeholder_selection_tracks_edits() {
        let mut ed = editor();
        ed.set_selection(SelectionState::collapsed(Position::new(NodeId(2), 3)));
        ed.begin_placeholder("typing");
        ed.insert_text(NodeId(2), 0, "Oh ").unwrap();
        assert_eq!(
            ed.placeholder_selection(),
            Some(&SelectionState::collapsed(Position::new(NodeId(2), 6)))
        );
        ed.end_placeholder().unwrap();
        assert_eq!(ed.placeholder_selection(), None);
    }

    #[test]
    fn test_cleared_selection_restored_from_window_start() {
        let mut ed = editor();
        ed.set_selection(SelectionState::collapsed(Position::new(NodeId(2), 1)));
        ed.begin_placeholder("typing");
        ed.insert_text(NodeId(2), 0, "x").unwrap();
        ed.set_selection(SelectionState::new());
        ed.end_placeholder().unwrap();
        assert_eq!(
            ed.selection(),
            SelectionState::collapsed(Position::new(NodeId(2), 2))
        );
    }

    #[test]
    fn test_unknown_batch() {
        let mut ed = editor();
        assert_eq!(
            ed.mark_fixed(BatchId(42)),
            Err(EditorError::UnknownBatch(BatchId(42)))
        );
    }

    #[test]
    fn test_disabled_undo_still_tracks_dirty_state() {
        let mut ed = editor();
        ed.enable_undo(false);
        ed.insert_text(NodeId(2), 0, "x").unwrap();
        assert!(ed.is_dirty());
        assert_eq!(ed.undo(1), Err(EditorError::UndoUnavailable));
        ed.mark_clean();
        assert!(!ed.is_dirty());
    }

    #[test]
    fn test_transient_edits_leave_no_trace() {
        let mut ed = editor();
        ed.transient(|e| e.insert_text(NodeId(2), 5, "?")).unwrap();
        assert_eq!(markup(&ed), "<body><p>Hello?</p></body>");
        assert!(!ed.can_undo());
        assert!(!ed.is_dirty());
    }

    #[test]
    fn test_panicking_transient_block_restores_recording() {
        let mut ed = editor();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            ed.transient(|e| {
                e.insert_text(NodeId(2), 0, "?").unwrap();
                panic!("edit callback failed");
            })
        }));
        assert!(outcome.is_err());
        assert!(!ed.can_undo());

        ed.insert_text(NodeId(2), 0, "!").unwrap();
        assert!(ed.can_undo());
        assert!(ed.is_dirty());
    }

    #[test]
    fn test_do_transaction_records_prebuilt_transaction() {
        let mut ed = editor();
        ed.do_transaction(Transaction::insert_text(NodeId(2), 0, ">"))
            .unwrap();
        assert_eq!(ed.undo_len(), 1);
        assert!(ed.is_dirty());
        ed.undo(1).unwrap();
        assert_eq!(markup(&ed), "<body><p>Hello</p></body>");
        assert!(!ed.is_dirty());
    }
}
