//! # Docmut Editor
//!
//! Transactional editing engine for node trees.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ editor: edit entry points                   │
//! │  - Precondition checks + listener protocol  │
//! │  - Placeholder windows (typing batches)     │
//! │  - Dirty tracking                           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ transaction_manager: undo / redo stacks     │
//! │  - Merge, fix, evict                        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ transaction: reversible leaf edits          │
//! │  - Range tracker keeps selections in place  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ host: TreeProvider + SelectionProvider      │
//! │  (MemoryTree in-process implementation)     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The host owns the tree**: the editor only calls its primitives
//! 2. **Every edit is reversible**: leaves record what undo needs
//! 3. **One user action, one undo step**: placeholder batches group and
//!    merge edits
//! 4. **Selections survive edits**: tracked snapshots follow the content
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docmut_editor::{Editor, MemoryTree, NodeSpec};
//!
//! let tree = MemoryTree::from_spec(&NodeSpec::element("p", vec![NodeSpec::text("Hi")]));
//! let text = tree.children(tree.root())[0];
//! let mut editor = Editor::new(tree);
//!
//! editor.begin_placeholder("typing");
//! editor.insert_text(text, 2, "!")?;
//! editor.insert_text(text, 3, "!")?;
//! editor.end_placeholder()?;
//!
//! editor.undo(1)?; // both characters
//! ```

mod config;
mod editor;
mod errors;
mod listener;
mod memory;
mod modification;
mod mutations;
mod placeholder;
mod range_tracker;
mod selection;
mod snapshot;
mod transaction;
mod transaction_manager;
mod tree;

pub use config::{EditorConfig, EmptyTextInsert, DEFAULT_CONFIG_NAME};
pub use editor::Editor;
pub use errors::{ConfigError, EditorError, ListenerError};
pub use listener::{EditListener, ListenerId};
pub use memory::{MemoryTree, NodeSpec};
pub use modification::ModificationTracker;
pub use mutations::{EditOp, MutationKind, PreconditionError};
pub use placeholder::{AggregateTransaction, BatchId, PlaceholderBatch};
pub use range_tracker::{RangeChange, RangeTracker, TrackerId};
pub use selection::{Position, SelectionRange, SelectionState};
pub use snapshot::NodeSnapshot;
pub use transaction::{
    DeleteNodeTxn, DeleteTextTxn, EditContext, EditOutput, InsertNodeTxn, InsertTextTxn,
    JoinNodesTxn, MoveNodeTxn, SplitNodeTxn, Transaction, TransactionKind,
};
pub use transaction_manager::{Commit, TransactionManager};
pub use tree::{Host, NodeId, SelectionProvider, TreeError, TreeProvider};
