//! Longer edit sequences
//!
//! This tests:
//! - Split / join / move chains and their undo
//! - Host failures during batched undo and redo
//! - Configuration switches (caret placement, undo toggle, history limit)
//! - Manager-level batches and transient edits

use docmut_editor::{
    Editor, EditorConfig, EditorError, MemoryTree, NodeId, NodeSpec, Position, SelectionState,
    Transaction, TreeProvider,
};

/// body#0 > [p#1 > "one two"#2, p#3 > "three"#4]
fn document() -> Editor<MemoryTree> {
    document_with(EditorConfig::default())
}

fn document_with(config: EditorConfig) -> Editor<MemoryTree> {
    Editor::with_config(
        MemoryTree::from_spec(&NodeSpec::element(
            "body",
            vec![
                NodeSpec::element("p", vec![NodeSpec::text("one two")]),
                NodeSpec::element("p", vec![NodeSpec::text("three")]),
            ],
        )),
        config,
    )
}

const BODY: NodeId = NodeId(0);
const P1: NodeId = NodeId(1);
const ONE_TWO: NodeId = NodeId(2);
const P2: NodeId = NodeId(3);
const THREE: NodeId = NodeId(4);

fn markup(editor: &Editor<MemoryTree>) -> String {
    editor.snapshot(editor.host().root()).to_markup()
}

const ORIGINAL: &str = "<body><p>one two</p><p>three</p></body>";

#[test]
fn test_paragraph_break_then_merge_back() {
    let mut editor = document();
    editor.set_selection(SelectionState::collapsed(Position::new(ONE_TWO, 4)));

    // Enter at "one |two": split the text, then the paragraph
    editor.begin_placeholder("paragraph");
    editor.split_node(ONE_TWO, 4).unwrap();
    let new_p = editor.split_node(P1, 1).unwrap();
    editor.end_placeholder().unwrap();
    assert_eq!(
        markup(&editor),
        "<body><p>one </p><p>two</p><p>three</p></body>"
    );
    // caret stays in front of "two"
    assert_eq!(
        editor.selection(),
        SelectionState::collapsed(Position::new(ONE_TWO, 0))
    );

    // Backspace at the start of "two": join the paragraphs back
    editor.begin_placeholder("join");
    editor.join_nodes(new_p, P1).unwrap();
    editor.end_placeholder().unwrap();
    assert_eq!(
        markup(&editor),
        "<body><p>one two</p><p>three</p></body>"
    );
    assert_eq!(editor.host().children(new_p).len(), 2);

    editor.undo(2).unwrap();
    assert_eq!(markup(&editor), ORIGINAL);
    assert_eq!(
        editor.selection(),
        SelectionState::collapsed(Position::new(ONE_TWO, 4))
    );
}

#[test]
fn test_move_chain_undo_and_redo() -> anyhow::Result<()> {
    let mut editor = document();
    editor.move_node(P2, BODY, 0)?;
    editor.move_node(THREE, P1, 0)?;
    assert_eq!(
        markup(&editor),
        "<body><p></p><p>threeone two</p></body>"
    );

    editor.undo(2)?;
    assert_eq!(markup(&editor), ORIGINAL);
    editor.redo(2)?;
    assert_eq!(
        markup(&editor),
        "<body><p></p><p>threeone two</p></body>"
    );
    Ok(())
}

#[test]
fn test_tracked_selection_follows_split_and_join() {
    let mut editor = document();
    let tracked = editor.register_selection(SelectionState::collapsed(Position::new(ONE_TWO, 5)));

    let left = editor.split_node(ONE_TWO, 4).unwrap();
    assert_eq!(
        editor.tracked_selection(tracked),
        Some(&SelectionState::collapsed(Position::new(ONE_TWO, 1)))
    );

    editor.join_nodes(left, ONE_TWO).unwrap();
    assert_eq!(
        editor.tracked_selection(tracked),
        Some(&SelectionState::collapsed(Position::new(left, 5)))
    );

    editor.undo(2).unwrap();
    assert_eq!(
        editor.tracked_selection(tracked),
        Some(&SelectionState::collapsed(Position::new(ONE_TWO, 5)))
    );
    assert!(editor.unregister_selection(tracked).is_some());
    assert!(editor.ranges().is_empty());
}

#[test]
fn test_failed_batch_undo_leaves_batch_applied() {
    let mut editor = document();
    let extra = editor.host_mut().create_text("x");
    editor.begin_placeholder("typing");
    editor.insert_node(P2, 1, extra).unwrap();
    editor.insert_text(THREE, 5, "!").unwrap();
    editor.end_placeholder().unwrap();

    // pull the inserted node out behind the editor's back
    editor.host_mut().remove_child(P2, 1).unwrap();

    // the text undo succeeds, the node undo is out of sync, the text is re-applied
    let err = editor.undo(1).unwrap_err();
    assert!(matches!(
        err,
        EditorError::HistoryInterrupted { completed: 0, requested: 1, .. }
    ));
    assert_eq!(markup(&editor), "<body><p>one two</p><p>three!</p></body>");
    assert_eq!(editor.undo_len(), 1);
    assert_eq!(editor.redo_len(), 0);
    assert!(editor.is_dirty());

    editor.host_mut().insert_child(P2, 1, extra).unwrap();
    editor.undo(1).unwrap();
    assert_eq!(markup(&editor), ORIGINAL);
    assert!(!editor.is_dirty());
}

#[test]
fn test_partial_multi_step_redo() {
    let mut editor = document();
    editor.insert_text(THREE, 0, "a").unwrap();
    editor.insert_text(THREE, 0, "b").unwrap();
    editor.undo(2).unwrap();

    editor.host_mut().fail_after(Some(1));
    let err = editor.redo(2).unwrap_err();
    assert!(matches!(
        err,
        EditorError::HistoryInterrupted { completed: 1, requested: 2, .. }
    ));
    assert_eq!(editor.undo_len(), 1);
    assert_eq!(editor.redo_len(), 1);
    assert_eq!(editor.modification_count(), 1);
}

#[test]
fn test_transactions_set_selection() {
    let config = EditorConfig {
        transactions_set_selection: true,
        ..EditorConfig::default()
    };
    let mut editor = document_with(config);
    editor.set_selection(SelectionState::collapsed(Position::new(THREE, 0)));

    editor.insert_text(ONE_TWO, 3, "!").unwrap();
    assert_eq!(
        editor.selection(),
        SelectionState::collapsed(Position::new(ONE_TWO, 4))
    );

    editor.set_should_transactions_set_selection(false);
    editor.set_selection(SelectionState::collapsed(Position::new(THREE, 0)));
    editor.insert_text(ONE_TWO, 0, "?").unwrap();
    assert_eq!(
        editor.selection(),
        SelectionState::collapsed(Position::new(THREE, 0))
    );
}

#[test]
fn test_toggling_undo_drops_history() {
    let mut editor = document();
    editor.insert_text(THREE, 0, "x").unwrap();
    assert!(editor.can_undo());

    editor.enable_undo(false);
    assert!(!editor.can_undo());
    editor.insert_text(THREE, 0, "y").unwrap();

    editor.enable_undo(true);
    assert!(!editor.can_undo());
    editor.insert_text(THREE, 0, "z").unwrap();
    assert_eq!(editor.undo_len(), 1);
    editor.undo(1).unwrap();
    assert_eq!(markup(&editor), "<body><p>one two</p><p>yxthree</p></body>");
    assert!(editor.is_dirty());
}

#[test]
fn test_config_history_limit_applies() {
    let config = EditorConfig::from_json(r#"{"historyLimit": 1}"#).unwrap();
    let mut editor = document_with(config);
    editor.insert_text(THREE, 0, "a").unwrap();
    editor.insert_text(THREE, 0, "b").unwrap();
    assert_eq!(editor.undo_len(), 1);
    assert_eq!(editor.history_limit(), 1);
}

#[test]
fn test_manager_batch_groups_standalone_edits() {
    let mut editor = document();
    editor.begin_batch();
    editor.insert_text(THREE, 0, "a").unwrap();
    editor.delete_node(BODY, 0).unwrap();
    assert_eq!(editor.undo(1), Err(EditorError::BatchOpen));
    editor.end_batch().unwrap();

    assert_eq!(editor.undo_len(), 1);
    assert_eq!(editor.modification_count(), 1);
    editor.undo(1).unwrap();
    assert_eq!(markup(&editor), ORIGINAL);
    assert_eq!(editor.end_batch(), Err(EditorError::BatchNotOpen));
}

#[test]
fn test_transient_edit_inside_batch() {
    let mut editor = document();
    editor.begin_placeholder("typing");
    editor.insert_text(THREE, 5, "s").unwrap();
    editor
        .transient(|e| e.insert_text(ONE_TWO, 0, "#"))
        .unwrap();
    editor.end_placeholder().unwrap();
    assert_eq!(editor.modification_count(), 1);

    // the batch owns both children
    editor.undo(1).unwrap();
    assert_eq!(markup(&editor), ORIGINAL);
}

#[test]
fn test_prebuilt_aggregate_transaction() -> anyhow::Result<()> {
    let mut editor = document();
    let txn = Transaction::aggregate(vec![
        Transaction::insert_text(THREE, 0, "x"),
        Transaction::delete_text(ONE_TWO, 0, 4),
    ]);
    editor.do_transaction(txn)?;
    assert_eq!(markup(&editor), "<body><p>two</p><p>xthree</p></body>");

    editor.undo(1)?;
    assert_eq!(markup(&editor), ORIGINAL);
    Ok(())
}

#[test]
fn test_failed_prebuilt_transaction_rolls_back() {
    let mut editor = document();
    let txn = Transaction::aggregate(vec![
        Transaction::insert_text(THREE, 0, "x"),
        Transaction::delete_text(ONE_TWO, 0, 40),
    ]);
    assert!(editor.do_transaction(txn).is_err());
    assert_eq!(markup(&editor), ORIGINAL);
    assert!(!editor.can_undo());
    assert!(!editor.is_dirty());
}

#[test]
fn test_mark_clean_fixes_top_entry() {
    let mut editor = document();
    editor.begin_placeholder("typing");
    editor.insert_text(THREE, 5, "a").unwrap();
    editor.end_placeholder().unwrap();
    editor.mark_clean();

    editor.begin_placeholder("typing");
    editor.insert_text(THREE, 6, "b").unwrap();
    editor.end_placeholder().unwrap();
    assert_eq!(editor.undo_len(), 2);

    editor.undo(1).unwrap();
    assert!(!editor.is_dirty());
}

#[test]
fn test_split_at_boundaries_changes_structure() {
    let mut editor = document();
    let before = editor.split_node(P2, 0).unwrap();
    let after = editor.split_node(THREE, 5).unwrap();
    assert_eq!(
        markup(&editor),
        "<body><p>one two</p><p></p><p>three</p></body>"
    );
    assert_eq!(editor.host().children(P2), &[after, THREE]);
    assert_eq!(editor.host().children(before).len(), 0);
}

#[test]
fn test_undo_skips_selection_in_transiently_removed_node() -> anyhow::Result<()> {
    let mut editor = document();
    editor.set_selection(SelectionState::collapsed(Position::new(ONE_TWO, 3)));
    editor.insert_text(THREE, 0, "x")?;
    editor.transient(|e| e.delete_node(BODY, 0))?;
    assert_eq!(markup(&editor), "<body><p>xthree</p></body>");

    editor.undo(1)?;
    assert_eq!(markup(&editor), "<body><p>three</p></body>");
    let selection = editor.selection();
    assert!(!selection.is_empty());
    assert!(selection
        .positions()
        .all(|pos| editor.host().is_attached(pos.node)));

    editor.redo(1)?;
    assert!(editor
        .selection()
        .positions()
        .all(|pos| editor.host().is_attached(pos.node)));
    Ok(())
}
