use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ConfigError;

pub const DEFAULT_CONFIG_NAME: &str = "docmut.config.json";

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum undo entries (-1 = unbounded, 0 = history disabled)
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,

    /// Whether edits are recorded at all
    #[serde(default = "default_undo_enabled")]
    pub undo_enabled: bool,

    /// Collapse the selection at the edit point after each edit
    #[serde(default)]
    pub transactions_set_selection: bool,

    /// What to do with inserts of empty text
    #[serde(default)]
    pub empty_text_insert: EmptyTextInsert,
}

fn default_history_limit() -> i64 {
    -1
}

fn default_undo_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyTextInsert {
    /// Succeed without touching the tree or the history
    #[default]
    Ignore,
    /// Record an empty transaction like any other edit
    Record,
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load config from a file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            undo_enabled: default_undo_enabled(),
            transactions_set_selection: false,
            empty_text_insert: EmptyTextInsert::default(),
        }
    }
}
