use anyhow::{anyhow, Context, Result};
use docmut_editor::{EditorConfig, DEFAULT_CONFIG_NAME};
use std::path::{Path, PathBuf};

/// Config path used when none is given on the command line
pub fn default_config_path(cwd: &str) -> PathBuf {
    PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME)
}

/// Load the editor config
///
/// An explicit path must exist. Without one, `docmut.config.json` in `cwd`
/// is used if present, otherwise the defaults.
pub fn load_config(explicit: Option<&Path>, cwd: &str) -> Result<EditorConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow!("Config file does not exist: {}", path.display()));
            }
            path.to_path_buf()
        }
        None => default_config_path(cwd),
    };

    let config = EditorConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        history_limit = config.history_limit,
        undo_enabled = config.undo_enabled,
        "config loaded"
    );
    Ok(config)
}
