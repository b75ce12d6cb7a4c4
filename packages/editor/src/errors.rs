//! Error types for the editor

use thiserror::Error;

use crate::mutations::PreconditionError;
use crate::placeholder::BatchId;
use crate::tree::TreeError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Invalid edit: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Transaction failed: {0}")]
    Transaction(#[from] TreeError),

    #[error("Nothing to undo")]
    UndoUnavailable,

    #[error("Nothing to redo")]
    RedoUnavailable,

    #[error("Stopped after {completed} of {requested} history steps: {source}")]
    HistoryInterrupted {
        completed: usize,
        requested: usize,
        #[source]
        source: TreeError,
    },

    #[error("No batch is open")]
    BatchNotOpen,

    #[error("Undo and redo are unavailable while a batch is open")]
    BatchOpen,

    #[error("Unknown batch: {0}")]
    UnknownBatch(BatchId),
}

/// Failure reported by a listener callback; logged, never propagated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Listener failed: {0}")]
pub struct ListenerError(pub String);

impl From<String> for ListenerError {
    fn from(s: String) -> Self {
        ListenerError(s)
    }
}

impl From<&str> for ListenerError {
    fn from(s: &str) -> Self {
        ListenerError(s.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
