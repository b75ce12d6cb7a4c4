use crate::config::default_config_path;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use docmut_editor::{EditorConfig, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::PathBuf;

/// Starter script written next to the config
pub const EXAMPLE_SCRIPT: &str = r#"{
  "tree": { "tag": "body", "children": [
    { "tag": "p", "children": [{ "text": "Hello" }] }
  ] },
  "selection": [{ "anchor": { "node": 2, "offset": 5 }, "focus": { "node": 2, "offset": 5 } }],
  "steps": [
    { "beginPlaceholder": { "name": "typing" } },
    { "edit": { "InsertText": { "node": 2, "offset": 5, "text": "," } } },
    { "edit": { "InsertText": { "node": 2, "offset": 6, "text": " world" } } },
    "endPlaceholder",
    { "create": { "tag": "p", "children": [{ "text": "Second" }] } },
    { "edit": { "InsertNode": { "parent": 0, "index": 1, "node": 3 } } },
    "markClean",
    { "edit": { "SplitNode": { "node": 2, "offset": 5 } } },
    { "undo": {} }
  ]
}
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Maximum undo entries (-1 = unbounded)
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    pub history_limit: i64,

    /// Name of the example script
    #[arg(short, long, default_value = "example.json")]
    pub script: String,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = default_config_path(cwd);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing docmut...".bright_blue().bold());

    let config = EditorConfig {
        history_limit: args.history_limit,
        ..EditorConfig::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let script_path = PathBuf::from(cwd).join(&args.script);
    if !script_path.exists() || args.force {
        fs::write(&script_path, EXAMPLE_SCRIPT)?;
        println!("  {} Created {}", "✓".green(), args.script);
    }

    println!();
    println!("Next steps:");
    println!("  1. Edit {}", args.script);
    println!("  2. Run: docmut replay {}", args.script);

    Ok(())
}
