use crate::config::load_config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use docmut_editor::{
    EditListener, EditOp, EditOutput, Editor, EditorConfig, EditorError, Host, ListenerError,
    MemoryTree, NodeSnapshot, NodeSpec, SelectionState,
};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Script to run (JSON)
    pub script: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Record failing steps and carry on instead of stopping
    #[arg(short, long)]
    pub keep_going: bool,
}

/// An edit script: the starting document and what to do to it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub tree: NodeSpec,
    #[serde(default)]
    pub selection: SelectionState,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Edit(EditOp),
    /// Allocate a detached subtree for a later `InsertNode`
    Create(NodeSpec),
    Select(SelectionState),
    Undo {
        #[serde(default = "one")]
        count: usize,
    },
    Redo {
        #[serde(default = "one")]
        count: usize,
    },
    BeginPlaceholder {
        #[serde(default)]
        name: Option<String>,
    },
    EndPlaceholder,
    BeginBatch,
    EndBatch,
    MarkClean,
    MarkTopFixed,
    SetHistoryLimit(i64),
    /// Edits excluded from history and dirty tracking
    Transient(Vec<EditOp>),
}

impl Step {
    fn describe(&self) -> String {
        match self {
            Step::Edit(op) => format!("edit {}", op.kind()),
            Step::Create(_) => "create".to_string(),
            Step::Select(_) => "select".to_string(),
            Step::Undo { count } => format!("undo {}", count),
            Step::Redo { count } => format!("redo {}", count),
            Step::BeginPlaceholder { name: Some(name) } => format!("begin placeholder {:?}", name),
            Step::BeginPlaceholder { name: None } => "begin placeholder".to_string(),
            Step::EndPlaceholder => "end placeholder".to_string(),
            Step::BeginBatch => "begin batch".to_string(),
            Step::EndBatch => "end batch".to_string(),
            Step::MarkClean => "mark clean".to_string(),
            Step::MarkTopFixed => "mark top fixed".to_string(),
            Step::SetHistoryLimit(limit) => format!("history limit {}", limit),
            Step::Transient(ops) => format!("transient x{}", ops.len()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Step {index} ({step}) failed: {source}")]
    StepFailed {
        index: usize,
        step: String,
        #[source]
        source: EditorError,
    },

    #[error("Script ended with {0} placeholder window(s) still open")]
    UnclosedWindow(usize),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub index: usize,
    pub step: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Counts commits and reports dirty-state flips
#[derive(Default)]
struct Journal {
    commits: Cell<usize>,
}

impl<H: Host> EditListener<H> for Journal {
    fn document_state_changed(
        &self,
        _editor: &mut Editor<H>,
        is_dirty: bool,
    ) -> Result<(), ListenerError> {
        info!(is_dirty, "document state changed");
        Ok(())
    }

    fn edit_committed(&self, _editor: &mut Editor<H>) -> Result<(), ListenerError> {
        self.commits.set(self.commits.get() + 1);
        debug!(commits = self.commits.get(), "edit committed");
        Ok(())
    }
}

pub struct Replay {
    pub editor: Editor<MemoryTree>,
    pub outcomes: Vec<StepOutcome>,
    pub commits: usize,
}

/// Final state of a replay, as printed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub markup: String,
    pub document: NodeSnapshot,
    pub selection: SelectionState,
    pub undo_len: usize,
    pub redo_len: usize,
    pub dirty: bool,
    pub modification_count: i64,
    pub commits: usize,
    pub steps: Vec<StepOutcome>,
}

impl Replay {
    pub fn report(&self) -> Report {
        let document = self.editor.snapshot(self.editor.host().root());
        Report {
            markup: document.to_markup(),
            document,
            selection: self.editor.selection(),
            undo_len: self.editor.undo_len(),
            redo_len: self.editor.redo_len(),
            dirty: self.editor.is_dirty(),
            modification_count: self.editor.modification_count(),
            commits: self.commits,
            steps: self.outcomes.clone(),
        }
    }
}

fn describe_output(output: EditOutput) -> Option<String> {
    match output {
        EditOutput::Done => None,
        EditOutput::Node(node) => Some(format!("-> {}", node)),
        EditOutput::Text(text) => Some(format!("removed {:?}", text)),
        EditOutput::Skipped => Some("skipped".to_string()),
    }
}

fn run_step(editor: &mut Editor<MemoryTree>, step: &Step) -> Result<Option<String>, EditorError> {
    match step {
        Step::Edit(op) => Ok(describe_output(editor.apply(op.clone())?)),
        Step::Create(spec) => {
            let node = editor.host_mut().create_from_spec(spec);
            Ok(Some(format!("created {}", node)))
        }
        Step::Select(selection) => {
            editor.set_selection(selection.clone());
            Ok(None)
        }
        Step::Undo { count } => {
            let moved = editor.undo(*count)?;
            Ok(Some(format!("{} undone", moved)))
        }
        Step::Redo { count } => {
            let moved = editor.redo(*count)?;
            Ok(Some(format!("{} redone", moved)))
        }
        Step::BeginPlaceholder { name } => {
            let id = match name {
                Some(name) => editor.begin_placeholder(name),
                None => editor.begin_anonymous_placeholder(),
            };
            Ok(Some(id.to_string()))
        }
        Step::EndPlaceholder => editor.end_placeholder().map(|_| None),
        Step::BeginBatch => {
            editor.begin_batch();
            Ok(None)
        }
        Step::EndBatch => editor.end_batch().map(|_| None),
        Step::MarkClean => {
            editor.mark_clean();
            Ok(None)
        }
        Step::MarkTopFixed => {
            let fixed = editor.mark_top_fixed();
            Ok((!fixed).then(|| "nothing to fix".to_string()))
        }
        Step::SetHistoryLimit(limit) => {
            editor.set_history_limit(*limit);
            Ok(None)
        }
        Step::Transient(ops) => editor.transient(|editor| -> Result<Option<String>, EditorError> {
            for op in ops {
                editor.apply(op.clone())?;
            }
            Ok(None)
        }),
    }
}

/// Run `script` against a fresh in-memory document
pub fn run_script(
    script: &Script,
    config: EditorConfig,
    keep_going: bool,
) -> Result<Replay, ScriptError> {
    let mut editor = Editor::with_config(MemoryTree::from_spec(&script.tree), config);
    editor.set_selection(script.selection.clone());
    let journal = Rc::new(Journal::default());
    editor.add_listener(journal.clone());

    let mut outcomes = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let described = step.describe();
        match run_step(&mut editor, step) {
            Ok(detail) => outcomes.push(StepOutcome {
                index,
                step: described,
                ok: true,
                detail,
            }),
            Err(source) if keep_going => {
                warn!(index, step = %described, error = %source, "step failed");
                outcomes.push(StepOutcome {
                    index,
                    step: described,
                    ok: false,
                    detail: Some(source.to_string()),
                });
            }
            Err(source) => {
                return Err(ScriptError::StepFailed {
                    index,
                    step: described,
                    source,
                })
            }
        }
    }

    if editor.is_batching() {
        return Err(ScriptError::UnclosedWindow(editor.batch_depth()));
    }

    Ok(Replay {
        editor,
        outcomes,
        commits: journal.commits.get(),
    })
}

pub fn replay(args: ReplayArgs, config_path: Option<&Path>, cwd: &str) -> Result<()> {
    if args.format != "text" && args.format != "json" {
        return Err(anyhow!(
            "Invalid format: {}. Use: text or json",
            args.format
        ));
    }

    let config = load_config(config_path, cwd)?;
    let script_path = if args.script.is_absolute() {
        args.script.clone()
    } else {
        PathBuf::from(cwd).join(&args.script)
    };
    let content = fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let script = Script::from_json(&content)
        .with_context(|| format!("Invalid script {}", script_path.display()))?;

    let run = run_script(&script, config, args.keep_going)?;
    let report = run.report();

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&script_path, &report);
    }

    let failed = report.steps.iter().filter(|s| !s.ok).count();
    if failed > 0 {
        return Err(anyhow!("{} step(s) failed", failed));
    }
    Ok(())
}

fn print_report(path: &Path, report: &Report) {
    println!("{} {}", "▶ Replaying".bright_blue().bold(), path.display());
    for outcome in &report.steps {
        let mark = if outcome.ok { "✓".green() } else { "✗".red() };
        match &outcome.detail {
            Some(detail) => println!(
                "  {} {:>3} {} {}",
                mark,
                outcome.index,
                outcome.step,
                detail.dimmed()
            ),
            None => println!("  {} {:>3} {}", mark, outcome.index, outcome.step),
        }
    }
    println!();
    println!("{}", "Document".bold());
    println!("  {}", report.markup);

    let selection = report
        .selection
        .ranges()
        .iter()
        .map(|r| {
            if r.is_collapsed() {
                r.focus.to_string()
            } else {
                format!("{}..{}", r.anchor, r.focus)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "{}  {}",
        "Selection".bold(),
        if selection.is_empty() { "none".to_string() } else { selection }
    );
    println!(
        "{}    {} undo / {} redo, {} commit(s)",
        "History".bold(),
        report.undo_len,
        report.redo_len,
        report.commits
    );
    let state = if report.dirty {
        format!("dirty ({})", report.modification_count).yellow()
    } else {
        "clean".green()
    };
    println!("{}      {}", "State".bold(), state);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(steps: &str) -> Script {
        Script::from_json(&format!(
            r#"{{
                "tree": {{ "tag": "body", "children": [
                    {{ "tag": "p", "children": [{{ "text": "Hello" }}] }}
                ] }},
                "steps": {}
            }}"#,
            steps
        ))
        .unwrap()
    }

    #[test]
    fn test_parse_steps() {
        let s = script(
            r#"[
                { "edit": { "InsertText": { "node": 2, "offset": 5, "text": "!" } } },
                { "undo": {} },
                { "redo": { "count": 2 } },
                { "beginPlaceholder": { "name": "typing" } },
                "endPlaceholder",
                { "setHistoryLimit": 10 },
                { "transient": [] }
            ]"#,
        );
        assert_eq!(s.steps.len(), 7);
        assert!(matches!(s.steps[1], Step::Undo { count: 1 }));
        assert!(matches!(s.steps[2], Step::Redo { count: 2 }));
        assert!(matches!(s.steps[4], Step::EndPlaceholder));
        assert!(s.selection.is_empty());
    }

    #[test]
    fn test_replay_typing_batch() {
        let s = script(
            r#"[
                { "beginPlaceholder": { "name": "typing" } },
                { "edit": { "InsertText": { "node": 2, "offset": 5, "text": "," } } },
                { "edit": { "InsertText": { "node": 2, "offset": 6, "text": " world" } } },
                "endPlaceholder"
            ]"#,
        );
        let replay = run_script(&s, EditorConfig::default(), false).unwrap();
        let report = replay.report();
        assert_eq!(report.markup, "<body><p>Hello, world</p></body>");
        assert_eq!(report.undo_len, 1);
        assert_eq!(report.commits, 1);
        assert!(report.dirty);
    }

    #[test]
    fn test_create_then_insert() {
        let s = script(
            r#"[
                { "create": { "tag": "p", "children": [{ "text": "Second" }] } },
                { "edit": { "InsertNode": { "parent": 0, "index": 1, "node": 3 } } },
                { "undo": {} }
            ]"#,
        );
        let replay = run_script(&s, EditorConfig::default(), false).unwrap();
        let report = replay.report();
        assert_eq!(report.markup, "<body><p>Hello</p></body>");
        assert_eq!(report.steps[0].detail.as_deref(), Some("created #3"));
        assert_eq!(report.redo_len, 1);
        assert!(!report.dirty);
    }

    #[test]
    fn test_failing_step_stops_replay() {
        let s = script(r#"[{ "undo": {} }]"#);
        let err = run_script(&s, EditorConfig::default(), false)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ScriptError::StepFailed {
                index: 0,
                source: EditorError::UndoUnavailable,
                ..
            }
        ));
    }

    #[test]
    fn test_keep_going_records_failures() {
        let s = script(
            r#"[
                { "edit": { "DeleteText": { "node": 2, "offset": 3, "len": 9 } } },
                { "edit": { "DeleteText": { "node": 2, "offset": 3, "len": 2 } } }
            ]"#,
        );
        let replay = run_script(&s, EditorConfig::default(), true).unwrap();
        let report = replay.report();
        assert!(!report.steps[0].ok);
        assert!(report.steps[1].ok);
        assert_eq!(report.steps[1].detail.as_deref(), Some("removed \"lo\""));
        assert_eq!(report.markup, "<body><p>Hel</p></body>");
    }

    #[test]
    fn test_unclosed_window_is_an_error() {
        let s = script(r#"[{ "beginPlaceholder": {} }]"#);
        assert!(matches!(
            run_script(&s, EditorConfig::default(), false),
            Err(ScriptError::UnclosedWindow(1))
        ));
    }

    #[test]
    fn test_transient_steps_stay_clean() {
        let s = script(
            r#"[{ "transient": [
                { "InsertText": { "node": 2, "offset": 0, "text": ">" } }
            ] }]"#,
        );
        let replay = run_script(&s, EditorConfig::default(), false).unwrap();
        let report = replay.report();
        assert_eq!(report.markup, "<body><p>>Hello</p></body>");
        assert!(!report.dirty);
        assert_eq!(report.undo_len, 0);
    }

    #[test]
    fn test_config_applies_to_replay() {
        let s = script(
            r#"[
                { "edit": { "InsertText": { "node": 2, "offset": 0, "text": "a" } } },
                { "edit": { "InsertText": { "node": 2, "offset": 0, "text": "b" } } }
            ]"#,
        );
        let config = EditorConfig::from_json(r#"{ "historyLimit": 1 }"#).unwrap();
        let replay = run_script(&s, config, false).unwrap();
        assert_eq!(replay.report().undo_len, 1);
    }
}
