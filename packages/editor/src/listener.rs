//! Edit listeners.
//!
//! Listeners are notified synchronously and may call back into the editor,
//! including starting further edits. A callback error is logged and the
//! remaining listeners still run.

use crate::editor::Editor;
use crate::errors::{EditorError, ListenerError};
use crate::mutations::{EditOp, MutationKind};
use crate::transaction::EditOutput;
use crate::tree::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Callbacks around edits. Every method defaults to doing nothing.
pub trait EditListener<H: Host> {
    /// Before an edit that passed its preconditions
    fn will_mutate(
        &self,
        _editor: &mut Editor<H>,
        _kind: MutationKind,
        _op: &EditOp,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    /// After the edit ran, or failed inside the host
    fn did_mutate(
        &self,
        _editor: &mut Editor<H>,
        _kind: MutationKind,
        _op: &EditOp,
        _result: Result<&EditOutput, &EditorError>,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    /// The dirty state flipped
    fn document_state_changed(
        &self,
        _editor: &mut Editor<H>,
        _is_dirty: bool,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    /// A batch or standalone edit reached the history
    fn edit_committed(&self, _editor: &mut Editor<H>) -> Result<(), ListenerError> {
        Ok(())
    }
}
