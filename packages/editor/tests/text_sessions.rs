//! Rich-text sessions sharing the undo timeline with structural commands

use blockform_editor::{builtin_registry, EditorEngine, EngineConfig, TextChangeOps};
use blockform_model::Theme;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

/// Linear-history stand-in for a rich-text editor
struct FakeEditor {
    alive: Cell<bool>,
    states: RefCell<Vec<String>>,
    depth: Cell<usize>,
    native_undos: Cell<usize>,
}

impl FakeEditor {
    fn new(initial: &str) -> Rc<Self> {
        Rc::new(Self {
            alive: Cell::new(true),
            states: RefCell::new(vec![initial.to_string()]),
            depth: Cell::new(0),
            native_undos: Cell::new(0),
        })
    }

    fn type_text(&self, text: &str) -> Value {
        let mut states = self.states.borrow_mut();
        states.truncate(self.depth.get() + 1);
        let next = format!("{}{}", states[self.depth.get()], text);
        states.push(next);
        self.depth.set(self.depth.get() + 1);
        json!(states[self.depth.get()])
    }

    fn destroy(&self) {
        self.alive.set(false);
    }
}

impl TextChangeOps for FakeEditor {
    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn undo(&self) {
        self.native_undos.set(self.native_undos.get() + 1);
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    fn redo(&self) {
        let max = self.states.borrow().len() - 1;
        self.depth.set((self.depth.get() + 1).min(max));
    }

    fn undo_depth(&self) -> usize {
        self.depth.get()
    }

    fn get_content(&self) -> Value {
        json!(self.states.borrow()[self.depth.get()])
    }
}

fn engine_with_text() -> (EditorEngine, String) {
    let mut engine = EditorEngine::with_default_document(
        Arc::new(builtin_registry()),
        Theme::default(),
        EngineConfig::default(),
    );
    let doc = engine.document();
    let body = doc.node(&doc.root).unwrap().slots[0].clone();
    let text = engine.insert_new("text", body, None, None).unwrap();
    (engine, text)
}

fn content(engine: &EditorEngine, node_id: &str) -> Value {
    engine.document().node(node_id).unwrap().prop("content").cloned().unwrap()
}

fn type_into(engine: &mut EditorEngine, editor: &FakeEditor, node_id: &str, text: &str) {
    let value = editor.type_text(text);
    engine.sync_text_content(node_id, value).unwrap();
}

#[test]
fn test_each_undo_is_one_native_step() {
    let (mut engine, text) = engine_with_text();
    let editor = FakeEditor::new("");

    engine.begin_text_session(&text, editor.clone()).unwrap();
    for chunk in ["a", "b", "c"] {
        type_into(&mut engine, &editor, &text, chunk);
    }
    assert_eq!(content(&engine, &text), json!("abc"));
    assert_eq!(engine.history().undo_levels(), 2);

    assert!(engine.undo());
    assert_eq!(editor.native_undos.get(), 1);
    assert_eq!(content(&engine, &text), json!("ab"));
    assert_eq!(engine.undo_label(), Some("edit-text"));

    assert!(engine.undo());
    assert_eq!(editor.native_undos.get(), 2);
    assert_eq!(engine.undo_label(), Some("edit-text"));
    assert!(!engine.can_redo());

    assert!(engine.undo());
    assert_eq!(editor.native_undos.get(), 3);
    assert_eq!(content(&engine, &text), json!(""));
    assert_eq!(engine.undo_label(), Some("insert-node"));
    assert_eq!(engine.redo_label(), Some("edit-text"));
}

#[test]
fn test_redo_replays_session_then_moves_back() {
    let (mut engine, text) = engine_with_text();
    let editor = FakeEditor::new("");

    engine.begin_text_session(&text, editor.clone()).unwrap();
    type_into(&mut engine, &editor, &text, "x");
    type_into(&mut engine, &editor, &text, "y");

    engine.undo();
    engine.undo();
    assert_eq!(engine.redo_label(), Some("edit-text"));

    engine.redo();
    assert_eq!(content(&engine, &text), json!("x"));
    assert_eq!(engine.redo_label(), Some("edit-text"));

    engine.redo();
    assert_eq!(content(&engine, &text), json!("xy"));
    assert!(!engine.can_redo());
    assert_eq!(engine.undo_label(), Some("edit-text"));
}

#[test]
fn test_exhausted_session_falls_through() {
    let (mut engine, text) = engine_with_text();
    let editor = FakeEditor::new("");

    // Session opened but nothing typed
    engine.begin_text_session(&text, editor.clone()).unwrap();

    assert!(engine.undo());
    assert!(engine.document().node(&text).is_none());
    assert_eq!(editor.native_undos.get(), 0);
    assert_eq!(engine.history().redo_levels(), 2);
}

#[test]
fn test_dead_editor_restores_snapshots() {
    let (mut engine, text) = engine_with_text();
    let editor = FakeEditor::new("");

    engine.begin_text_session(&text, editor.clone()).unwrap();
    type_into(&mut engine, &editor, &text, "draft");
    editor.destroy();

    assert!(engine.undo());
    assert_eq!(content(&engine, &text), json!(""));
    assert_eq!(engine.undo_label(), Some("insert-node"));

    assert!(engine.redo());
    assert_eq!(content(&engine, &text), json!("draft"));
    assert_eq!(editor.native_undos.get(), 0);
}

#[test]
fn test_continued_typing_reuses_open_session() {
    let (mut engine, text) = engine_with_text();
    let editor = FakeEditor::new("");

    engine.begin_text_session(&text, editor.clone()).unwrap();
    type_into(&mut engine, &editor, &text, "a");
    engine.begin_text_session(&text, editor.clone()).unwrap();
    type_into(&mut engine, &editor, &text, "b");

    assert_eq!(engine.history().undo_levels(), 2);
}

#[test]
fn test_structural_edit_between_sessions() {
    let (mut engine, text) = engine_with_text();
    let editor = FakeEditor::new("");

    engine.begin_text_session(&text, editor.clone()).unwrap();
    type_into(&mut engine, &editor, &text, "hi");

    let doc = engine.document();
    let body = doc.node(&doc.root).unwrap().slots[0].clone();
    let divider = engine.insert_new("divider", body, None, None).unwrap();

    engine.undo();
    assert!(engine.document().node(&divider).is_none());
    assert_eq!(content(&engine, &text), json!("hi"));

    engine.undo();
    assert_eq!(content(&engine, &text), json!(""));

    engine.redo();
    engine.redo();
    assert!(engine.document().node(&divider).is_some());
    assert_eq!(content(&engine, &text), json!("hi"));
}

#[test]
fn test_sync_does_not_record_history() {
    let (mut engine, text) = engine_with_text();
    let levels = engine.history().undo_levels();

    engine.sync_text_content(&text, json!("typed")).unwrap();

    assert_eq!(engine.history().undo_levels(), levels);
    assert!(engine.sync_text_content("ghost", json!("x")).is_err());
}
