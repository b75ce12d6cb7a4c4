//! # Transactions
//!
//! Reversible units of work. Each edit operation maps to one leaf variant;
//! [`PlaceholderBatch`] and [`AggregateTransaction`] group leaves.
//!
//! ## Contract
//!
//! - `do_transaction` runs the primitive, then adjusts tracked ranges and
//!   the live selection for what physically happened
//! - `undo_transaction` runs the inverse primitive with the inverse
//!   adjustment
//! - `redo_transaction` replays `do` without moving the caret
//! - A failed step leaves the tree as it found it
//!
//! Leaves record what they need for undo (removed node, left half of a
//! split, pre-join length) the first time they run.

use tracing::{debug, error};

use crate::placeholder::{AggregateTransaction, PlaceholderBatch};
use crate::range_tracker::{RangeChange, RangeTracker};
use crate::selection::{Position, SelectionState};
use crate::tree::{Host, NodeId, SelectionProvider, TreeError, TreeProvider};

/// What a transaction works against
pub struct EditContext<'a> {
    pub host: &'a mut dyn Host,
    pub ranges: &'a mut RangeTracker,
    /// Collapse the live selection at the edit point after `do`
    pub place_caret: bool,
}

impl<'a> EditContext<'a> {
    pub fn new(host: &'a mut dyn Host, ranges: &'a mut RangeTracker, place_caret: bool) -> Self {
        Self {
            host,
            ranges,
            place_caret,
        }
    }

    /// Bring tracked snapshots and the live selection in line with a change
    /// that already happened in the tree
    pub(crate) fn did_change(&mut self, change: RangeChange) {
        self.ranges.adjust(&change, &*self.host);
        let mut live = self.host.current_selection();
        change.apply_to(&mut live, &*self.host);
        self.host.set_selection(live);
    }

    fn place_caret_at(&mut self, point: Position) {
        if self.place_caret {
            self.host.set_selection(SelectionState::collapsed(point));
        }
    }
}

fn out_of_sync(what: impl std::fmt::Display) -> TreeError {
    TreeError::Rejected(format!("history out of sync: {}", what))
}

fn attached(host: &dyn Host, node: NodeId) -> Result<(NodeId, usize), TreeError> {
    let parent = host
        .parent(node)
        .ok_or_else(|| TreeError::Rejected(format!("{} is detached", node)))?;
    let index = host.index_of(node).ok_or(TreeError::NodeNotFound(node))?;
    Ok((parent, index))
}

#[derive(Debug, Clone)]
pub struct InsertNodeTxn {
    parent: NodeId,
    index: usize,
    node: NodeId,
}

impl InsertNodeTxn {
    fn apply(&mut self, ctx: &mut EditContext<'_>) -> Result<Position, TreeError> {
        ctx.host.insert_child(self.parent, self.index, self.node)?;
        ctx.did_change(RangeChange::InsertNode {
            parent: self.parent,
            index: self.index,
        });
        Ok(Position::new(self.parent, self.index + 1))
    }

    fn revert(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        if ctx.host.child_at(self.parent, self.index) != Some(self.node) {
            return Err(out_of_sync(format!("{} moved away from {}", self.node, self.parent)));
        }
        ctx.host.remove_child(self.parent, self.index)?;
        ctx.did_change(RangeChange::DeleteNode {
            parent: self.parent,
            index: self.index,
            removed: self.node,
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeleteNodeTxn {
    parent: NodeId,
    index: usize,
    removed: Option<NodeId>,
}

impl DeleteNodeTxn {
    fn apply(&mut self, ctx: &mut EditContext<'_>) -> Result<Position, TreeError> {
        let removed = ctx.host.remove_child(self.parent, self.index)?;
        self.removed = Some(removed);
        ctx.did_change(RangeChange::DeleteNode {
            parent: self.parent,
            index: self.index,
            removed,
        });
        Ok(Position::new(self.parent, self.index))
    }

    fn revert(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        let node = self.removed.ok_or_else(|| out_of_sync("delete never ran"))?;
        ctx.host.insert_child(self.parent, self.index, node)?;
        ctx.did_change(RangeChange::InsertNode {
            parent: self.parent,
            index: self.index,
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SplitNodeTxn {
    node: NodeId,
    offset: usize,
    left: Option<NodeId>,
    parent: Option<NodeId>,
    left_index: usize,
}

impl SplitNodeTxn {
    fn apply(&mut self, ctx: &mut EditContext<'_>) -> Result<Position, TreeError> {
        let (parent, left_index) = attached(&*ctx.host, self.node)?;
        let left = ctx.host.split_node(self.node, self.offset, self.left)?;
        self.left = Some(left);
        self.parent = Some(parent);
        self.left_index = left_index;
        ctx.did_change(RangeChange::SplitNode {
            node: self.node,
            offset: self.offset,
            left,
            parent,
            left_index,
        });
        Ok(Position::new(self.node, 0))
    }

    fn revert(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        let (left, parent) = match (self.left, self.parent) {
            (Some(left), Some(parent)) => (left, parent),
            _ => return Err(out_of_sync("split never ran")),
        };
        ctx.host.unsplit_node(left, self.node)?;
        ctx.did_change(RangeChange::UnsplitNode {
            left,
            left_len: self.offset,
            node: self.node,
            parent,
            left_index: self.left_index,
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct JoinNodesTxn {
    keep: NodeId,
    discard: NodeId,
    keep_len: usize,
    parent: Option<NodeId>,
    discard_index: usize,
}

impl JoinNodesTxn {
    fn apply(&mut self, ctx: &mut EditContext<'_>) -> Result<Position, TreeError> {
        let (parent, discard_index) = attached(&*ctx.host, self.discard)?;
        let keep_len = ctx.host.content_len(self.keep);
        ctx.host.join_nodes(self.keep, self.discard)?;
        self.keep_len = keep_len;
        self.parent = Some(parent);
        self.discard_index = discard_index;
        ctx.did_change(RangeChange::JoinNodes {
            keep: self.keep,
            keep_len,
            discard: self.discard,
            parent,
            discard_index,
        });
        Ok(Position::new(self.keep, keep_len))
    }

    fn revert(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        let parent = self.parent.ok_or_else(|| out_of_sync("join never ran"))?;
        ctx.host.unjoin_nodes(self.keep, self.keep_len, self.discard)?;
        ctx.did_change(RangeChange::UnjoinNodes {
            keep: self.keep,
            keep_len: self.keep_len,
            discard: self.discard,
            parent,
            discard_index: self.discard_index,
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MoveNodeTxn {
    node: NodeId,
    new_parent: NodeId,
    new_index: usize,
    old: Option<(NodeId, usize)>,
}

impl MoveNodeTxn {
    /// Detach from one slot and attach at another; the first primitive is
    /// rolled back if the second is rejected
    fn relocate(
        ctx: &mut EditContext<'_>,
        node: NodeId,
        from: (NodeId, usize),
        to: (NodeId, usize),
    ) -> Result<(), TreeError> {
        if ctx.host.child_at(from.0, from.1) != Some(node) {
            return Err(out_of_sync(format!("{} is not at {}[{}]", node, from.0, from.1)));
        }
        ctx.host.remove_child(from.0, from.1)?;
        if let Err(err) = ctx.host.insert_child(to.0, to.1, node) {
            if let Err(rollback) = ctx.host.insert_child(from.0, from.1, node) {
                error!(node = %node, error = %rollback, "failed to restore node after rejected move");
                // the node stays detached; ranges must treat it as deleted
                ctx.did_change(RangeChange::DeleteNode {
                    parent: from.0,
                    index: from.1,
                    removed: node,
                });
                return Err(TreeError::Rejected(format!(
                    "{}; restoring {} to {}[{}] failed: {}",
                    err, node, from.0, from.1, rollback
                )));
            }
            return Err(err);
        }
        ctx.did_change(RangeChange::MoveNode {
            old_parent: from.0,
            old_index: from.1,
            new_parent: to.0,
            new_index: to.1,
        });
        Ok(())
    }

    fn apply(&mut self, ctx: &mut EditContext<'_>) -> Result<Position, TreeError> {
        let old = attached(&*ctx.host, self.node)?;
        Self::relocate(ctx, self.node, old, (self.new_parent, self.new_index))?;
        self.old = Some(old);
        Ok(Position::new(self.new_parent, self.new_index + 1))
    }

    fn revert(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        let old = self.old.ok_or_else(|| out_of_sync("move never ran"))?;
        Self::relocate(ctx, self.node, (self.new_parent, self.new_index), old)
    }
}

#[derive(Debug, Clone)]
pub struct InsertTextTxn {
    node: NodeId,
    offset: usize,
    text: String,
}

impl InsertTextTxn {
    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn apply(&mut self, ctx: &mut EditContext<'_>) -> Result<Position, TreeError> {
        ctx.host.insert_text(self.node, self.offset, &self.text)?;
        let len = self.len();
        ctx.did_change(RangeChange::InsertText {
            node: self.node,
            offset: self.offset,
            len,
        });
        Ok(Position::new(self.node, self.offset + len))
    }

    fn revert(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        let len = self.len();
        ctx.host.remove_text(self.node, self.offset, len)?;
        ctx.did_change(RangeChange::DeleteText {
            node: self.node,
            offset: self.offset,
            len,
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeleteTextTxn {
    node: NodeId,
    offset: usize,
    len: usize,
    removed: Option<String>,
}

impl DeleteTextTxn {
    fn apply(&mut self, ctx: &mut EditContext<'_>) -> Result<Position, TreeError> {
        let removed = ctx.host.remove_text(self.node, self.offset, self.len)?;
        self.removed = Some(removed);
        ctx.did_change(RangeChange::DeleteText {
            node: self.node,
            offset: self.offset,
            len: self.len,
        });
        Ok(Position::new(self.node, self.offset))
    }

    fn revert(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        let removed = self
            .removed
            .as_deref()
            .ok_or_else(|| out_of_sync("delete never ran"))?;
        ctx.host.insert_text(self.node, self.offset, removed)?;
        ctx.did_change(RangeChange::InsertText {
            node: self.node,
            offset: self.offset,
            len: self.len,
        });
        Ok(())
    }
}

/// Result of an executed leaf, as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum EditOutput {
    /// Applied; nothing to hand back
    Done,
    /// Node removed by a delete, or the new left half of a split
    Node(NodeId),
    /// Characters removed by a text delete
    Text(String),
    /// Ignored by configuration (empty text insert)
    Skipped,
}

#[derive(Debug)]
pub enum TransactionKind {
    InsertNode(InsertNodeTxn),
    DeleteNode(DeleteNodeTxn),
    SplitNode(SplitNodeTxn),
    JoinNodes(JoinNodesTxn),
    MoveNode(MoveNodeTxn),
    InsertText(InsertTextTxn),
    DeleteText(DeleteTextTxn),
    Placeholder(PlaceholderBatch),
    Aggregate(AggregateTransaction),
}

/// A reversible unit of work
#[derive(Debug)]
pub struct Transaction {
    kind: TransactionKind,
    transient: bool,
}

impl Transaction {
    fn leaf(kind: TransactionKind) -> Self {
        Self {
            kind,
            transient: false,
        }
    }

    pub fn insert_node(parent: NodeId, index: usize, node: NodeId) -> Self {
        Self::leaf(TransactionKind::InsertNode(InsertNodeTxn {
            parent,
            index,
            node,
        }))
    }

    pub fn delete_node(parent: NodeId, index: usize) -> Self {
        Self::leaf(TransactionKind::DeleteNode(DeleteNodeTxn {
            parent,
            index,
            removed: None,
        }))
    }

    pub fn split_node(node: NodeId, offset: usize) -> Self {
        Self::leaf(TransactionKind::SplitNode(SplitNodeTxn {
            node,
            offset,
            left: None,
            parent: None,
            left_index: 0,
        }))
    }

    pub fn join_nodes(keep: NodeId, discard: NodeId) -> Self {
        Self::leaf(TransactionKind::JoinNodes(JoinNodesTxn {
            keep,
            discard,
            keep_len: 0,
            parent: None,
            discard_index: 0,
        }))
    }

    pub fn move_node(node: NodeId, new_parent: NodeId, new_index: usize) -> Self {
        Self::leaf(TransactionKind::MoveNode(MoveNodeTxn {
            node,
            new_parent,
            new_index,
            old: None,
        }))
    }

    pub fn insert_text(node: NodeId, offset: usize, text: impl Into<String>) -> Self {
        Self::leaf(TransactionKind::InsertText(InsertTextTxn {
            node,
            offset,
            text: text.into(),
        }))
    }

    pub fn delete_text(node: NodeId, offset: usize, len: usize) -> Self {
        Self::leaf(TransactionKind::DeleteText(DeleteTextTxn {
            node,
            offset,
            len,
            removed: None,
        }))
    }

    pub fn placeholder(batch: PlaceholderBatch) -> Self {
        Self::leaf(TransactionKind::Placeholder(batch))
    }

    pub fn aggregate(children: Vec<Transaction>) -> Self {
        Self::leaf(TransactionKind::Aggregate(AggregateTransaction::new(children)))
    }

    /// Mark a leaf as excluded from modification counting and history
    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    pub fn kind(&self) -> &TransactionKind {
        &self.kind
    }

    pub fn label(&self) -> &'static str {
        match &self.kind {
            TransactionKind::InsertNode(_) => "insert-node",
            TransactionKind::DeleteNode(_) => "delete-node",
            TransactionKind::SplitNode(_) => "split-node",
            TransactionKind::JoinNodes(_) => "join-nodes",
            TransactionKind::MoveNode(_) => "move-node",
            TransactionKind::InsertText(_) => "insert-text",
            TransactionKind::DeleteText(_) => "delete-text",
            TransactionKind::Placeholder(_) => "placeholder",
            TransactionKind::Aggregate(_) => "aggregate",
        }
    }

    /// Groups are transient only when every child is
    pub fn is_transient(&self) -> bool {
        match &self.kind {
            TransactionKind::Placeholder(batch) => batch.is_transient(),
            TransactionKind::Aggregate(aggregate) => aggregate.is_transient(),
            _ => self.transient,
        }
    }

    /// Merge-compatibility tag; only named placeholder batches carry one
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TransactionKind::Placeholder(batch) => batch.name(),
            _ => None,
        }
    }

    pub fn as_placeholder(&self) -> Option<&PlaceholderBatch> {
        match &self.kind {
            TransactionKind::Placeholder(batch) => Some(batch),
            _ => None,
        }
    }

    pub fn as_placeholder_mut(&mut self) -> Option<&mut PlaceholderBatch> {
        match &mut self.kind {
            TransactionKind::Placeholder(batch) => Some(batch),
            _ => None,
        }
    }

    pub fn do_transaction(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        match &mut self.kind {
            TransactionKind::Placeholder(batch) => return batch.do_children(ctx),
            TransactionKind::Aggregate(aggregate) => return aggregate.do_children(ctx),
            _ => {}
        }
        let point = self.apply_leaf(ctx)?;
        debug!(txn = self.label(), point = %point, "transaction done");
        ctx.place_caret_at(point);
        Ok(())
    }

    pub fn undo_transaction(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        let label = self.label();
        match &mut self.kind {
            TransactionKind::InsertNode(txn) => txn.revert(ctx)?,
            TransactionKind::DeleteNode(txn) => txn.revert(ctx)?,
            TransactionKind::SplitNode(txn) => txn.revert(ctx)?,
            TransactionKind::JoinNodes(txn) => txn.revert(ctx)?,
            TransactionKind::MoveNode(txn) => txn.revert(ctx)?,
            TransactionKind::InsertText(txn) => txn.revert(ctx)?,
            TransactionKind::DeleteText(txn) => txn.revert(ctx)?,
            TransactionKind::Placeholder(batch) => batch.undo(ctx)?,
            TransactionKind::Aggregate(aggregate) => aggregate.undo(ctx)?,
        }
        debug!(txn = label, "transaction undone");
        Ok(())
    }

    pub fn redo_transaction(&mut self, ctx: &mut EditContext<'_>) -> Result<(), TreeError> {
        let grouped = match &mut self.kind {
            TransactionKind::Placeholder(batch) => {
                batch.redo(ctx)?;
                true
            }
            TransactionKind::Aggregate(aggregate) => {
                aggregate.redo(ctx)?;
                true
            }
            _ => false,
        };
        if !grouped {
            self.apply_leaf(ctx)?;
        }
        debug!(txn = self.label(), "transaction redone");
        Ok(())
    }

    /// Optional merge check against a candidate successor. On rejection the
    /// candidate is handed back untouched.
    pub fn try_merge(&mut self, next: Transaction) -> Result<(), Transaction> {
        let Transaction { kind, transient } = next;
        match (&mut self.kind, kind) {
            (TransactionKind::Placeholder(top), TransactionKind::Placeholder(batch)) => {
                top.absorb(batch).map_err(|batch| Transaction {
                    kind: TransactionKind::Placeholder(batch),
                    transient,
                })
            }
            (_, kind) => Err(Transaction { kind, transient }),
        }
    }

    /// What a completed leaf hands back to the caller
    pub fn output(&self) -> EditOutput {
        match &self.kind {
            TransactionKind::DeleteNode(txn) => txn.removed.map_or(EditOutput::Done, EditOutput::Node),
            TransactionKind::SplitNode(txn) => txn.left.map_or(EditOutput::Done, EditOutput::Node),
            TransactionKind::DeleteText(txn) => txn
                .removed
                .clone()
                .map_or(EditOutput::Done, EditOutput::Text),
            TransactionKind::Placeholder(batch) => batch
                .children()
                .last()
                .map_or(EditOutput::Done, Transaction::output),
            _ => EditOutput::Done,
        }
    }

    fn apply_leaf(&mut self, ctx: &mut EditContext<'_>) -> Result<Position, TreeError> {
        match &mut self.kind {
            TransactionKind::InsertNode(txn) => txn.apply(ctx),
            TransactionKind::DeleteNode(txn) => txn.apply(ctx),
            TransactionKind::SplitNode(txn) => txn.apply(ctx),
            TransactionKind::JoinNodes(txn) => txn.apply(ctx),
            TransactionKind::MoveNode(txn) => txn.apply(ctx),
            TransactionKind::InsertText(txn) => txn.apply(ctx),
            TransactionKind::DeleteText(txn) => txn.apply(ctx),
            TransactionKind::Placeholder(_) | TransactionKind::Aggregate(_) => {
                Err(TreeError::Rejected("group is not a leaf".to_string()))
            }
        }
    }
}

/// Run `children` forward (do or redo). If one fails, the ones already run
/// are undone so the group fails as a whole.
pub(crate) fn run_forward(
    children: &mut [Transaction],
    ctx: &mut EditContext<'_>,
    redo: bool,
) -> Result<(), TreeError> {
    for i in 0..children.len() {
        let result = if redo {
            children[i].redo_transaction(ctx)
        } else {
            children[i].do_transaction(ctx)
        };
        if let Err(err) = result {
            for done in children[..i].iter_mut().rev() {
                if let Err(rollback) = done.undo_transaction(ctx) {
                    error!(txn = done.label(), error = %rollback, "rollback failed");
                    break;
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Undo `children` last-to-first, re-applying the undone ones on failure
pub(crate) fn run_backward(
    children: &mut [Transaction],
    ctx: &mut EditContext<'_>,
) -> Result<(), TreeError> {
    for i in (0..children.len()).rev() {
        if let Err(err) = children[i].undo_transaction(ctx) {
            for undone in children[i + 1..].iter_mut() {
                if let Err(rollback) = undone.redo_transaction(ctx) {
                    error!(txn = undone.label(), error = %rollback, "rollback failed");
                    break;
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTree;

    fn setup() -> (MemoryTree, RangeTracker, NodeId, NodeId) {
        let mut tree = MemoryTree::new("body");
        let p = tree.create_element("p");
        tree.append(tree.root(), p).unwrap();
        let text = tree.create_text("Hello");
        tree.append(p, text).unwrap();
        (tree, RangeTracker::new(), p, text)
    }

    #[test]
    fn test_insert_text_do_undo_redo() {
        let (mut tree, mut ranges, _, text) = setup();
        let mut txn = Transaction::insert_text(text, 5, " world");
        let mut ctx = EditContext::new(&mut tree, &mut ranges, false);

        txn.do_transaction(&mut ctx).unwrap();
        assert_eq!(ctx.host.text(text).as_deref(), Some("Hello world"));

        txn.undo_transaction(&mut ctx).unwrap();
        assert_eq!(ctx.host.text(text).as_deref(), Some("Hello"));

        txn.redo_transaction(&mut ctx).unwrap();
        assert_eq!(ctx.host.text(text).as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_delete_node_records_removed_node() {
        let (mut tree, mut ranges, p, text) = setup();
        let mut txn = Transaction::delete_node(p, 0);
        let mut ctx = EditContext::new(&mut tree, &mut ranges, false);

        txn.do_transaction(&mut ctx).unwrap();
        assert_eq!(txn.output(), EditOutput::Node(text));
        assert_eq!(ctx.host.child_count(p), 0);

        txn.undo_transaction(&mut ctx).unwrap();
        assert_eq!(ctx.host.child_at(p, 0), Some(text));
    }

    #[test]
    fn test_place_caret_collapses_live_selection() {
        let (mut tree, mut ranges, _, text) = setup();
        let mut txn = Transaction::insert_text(text, 0, "Oh, ");
        let mut ctx = EditContext::new(&mut tree, &mut ranges, true);

        txn.do_transaction(&mut ctx).unwrap();
        assert_eq!(
            ctx.host.current_selection(),
            SelectionState::collapsed(Position::new(text, 4))
        );
    }

    #[test]
    fn test_live_selection_follows_edits() {
        let (mut tree, mut ranges, _, text) = setup();
        tree.set_selection(SelectionState::collapsed(Position::new(text, 3)));
        let mut txn = Transaction::delete_text(text, 0, 2);
        let mut ctx = EditContext::new(&mut tree, &mut ranges, false);

        txn.do_transaction(&mut ctx).unwrap();
        assert_eq!(
            ctx.host.current_selection(),
            SelectionState::collapsed(Position::new(text, 1))
        );
    }

    #[test]
    fn test_rejected_move_restores_node() {
        let (mut tree, mut ranges, p, text) = setup();
        let mut txn = Transaction::move_node(text, p, 5);
        let mut ctx = EditContext::new(&mut tree, &mut ranges, false);

        // detach succeeds, the out-of-range attach is rejected
        assert!(txn.do_transaction(&mut ctx).is_err());
        assert_eq!(ctx.host.child_at(p, 0), Some(text));
        assert_eq!(ctx.host.parent(text), Some(p));
    }

    #[test]
    fn test_failed_move_rollback_reports_detached_node() {
        let (mut tree, mut ranges, p, text) = setup();
        let root = tree.root();
        let tracked = ranges.register(SelectionState::collapsed(Position::new(text, 2)));
        tree.set_selection(SelectionState::range(Position::new(text, 1), Position::new(text, 3)));
        // the detach is the only write allowed
        tree.fail_after(Some(1));
        let mut txn = Transaction::move_node(text, root, 0);
        let mut ctx = EditContext::new(&mut tree, &mut ranges, false);

        let err = txn.do_transaction(&mut ctx).unwrap_err();
        assert!(matches!(&err, TreeError::Rejected(msg) if msg.contains("restoring")));
        assert_eq!(ctx.host.parent(text), None);
        assert_eq!(
            ctx.ranges.get(tracked),
            Some(&SelectionState::collapsed(Position::new(p, 0)))
        );
        assert_eq!(
            ctx.host.current_selection(),
            SelectionState::collapsed(Position::new(p, 0))
        );
    }

    #[test]
    fn test_forward_run_rolls_back_on_failure() {
        let (mut tree, mut ranges, _, text) = setup();
        let mut children = vec![
            Transaction::insert_text(text, 5, "!"),
            Transaction::delete_text(text, 0, 100),
        ];
        let mut ctx = EditContext::new(&mut tree, &mut ranges, false);

        assert!(run_forward(&mut children, &mut ctx, false).is_err());
        assert_eq!(ctx.host.text(text).as_deref(), Some("Hello"));
    }

    #[test]
    fn test_only_placeholders_merge() {
        let (_, _, _, text) = setup();
        let mut top = Transaction::insert_text(text, 0, "a");
        let next = Transaction::insert_text(text, 1, "b");
        let rejected = top.try_merge(next).unwrap_err();
        assert_eq!(rejected.label(), "insert-text");
    }
}
