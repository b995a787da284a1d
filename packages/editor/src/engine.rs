//! # Editor Engine
//!
//! Owns the live editing state: the current document snapshot and its
//! indexes, undo history, selection, theme and resolved styles, example data
//! and component state. All document edits go through [`EditorEngine::dispatch`]
//! (or undo/redo, which re-enter the same apply path).
//!
//! ## Lifecycle
//!
//! ```text
//! dispatch(command)
//!   → apply_command (pure, on the current snapshot)
//!   → install new snapshot (+ rebuild indexes if structural)
//!   → record inverse on the undo stack
//!   → emit doc:change
//! ```
//!
//! Snapshots are handed out as `Arc<TemplateDocument>`. A snapshot never
//! changes after it is published; every edit installs a new one.
//!
//! The engine holds text-editor handles through `Rc`, so it stays on the
//! thread that created it.

use crate::change::{Change, ChangeContext, CommandChange};
use crate::commands::{apply_command, Command, CommandError, CommandOutcome};
use crate::config::EngineConfig;
use crate::errors::EditorError;
use crate::events::{EditorEvent, EventBus};
use crate::indexes::{build_indexes, find_ancestor_at_level, get_ancestor_path, DocumentIndexes};
use crate::registry::{CreatedNode, ComponentRegistry};
use crate::styles::{
    resolve_document_styles, resolve_node_styles, resolve_page_settings, resolve_preset_styles,
};
use crate::text_change::{TextChange, TextChangeOps};
use crate::undo_stack::UndoStack;
use crate::validation::validate_document;
use blockform_common::IdGenerator;
use blockform_model::{
    NodeId, PageSettings, SlotId, StyleMap, TemplateDocument, Theme, MODEL_VERSION,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Apply without recording an undo entry
    pub skip_undo: bool,
}

/// A document holding only a registry-built `root` node
pub fn create_default_document(registry: &ComponentRegistry, ids: &mut IdGenerator) -> TemplateDocument {
    let Ok(created) = registry.create_node("root", None, ids) else {
        let root_id = ids.new_id_with_prefix("root");
        let slot_id = format!("{}-body", root_id);
        return TemplateDocument::with_root(root_id, slot_id);
    };

    let root = created.node.id.clone();
    TemplateDocument {
        model_version: MODEL_VERSION,
        root: root.clone(),
        nodes: BTreeMap::from([(root, created.node)]),
        slots: created
            .slots
            .into_iter()
            .map(|slot| (slot.id.clone(), slot))
            .collect(),
        theme_ref: "default".to_string(),
        document_styles_override: None,
        page_settings_override: None,
    }
}

#[derive(Debug)]
pub struct EditorEngine {
    registry: Arc<ComponentRegistry>,
    config: EngineConfig,

    doc: Arc<TemplateDocument>,
    indexes: Arc<DocumentIndexes>,
    history: UndoStack,
    selection: Option<NodeId>,

    theme: Theme,
    resolved_document_styles: StyleMap,
    resolved_page_settings: PageSettings,

    example_data: Value,
    component_state: HashMap<String, Value>,

    events: EventBus,
    ids: IdGenerator,

    /// Accumulated `structure_changed` of installs not yet announced
    pending_doc_change: Option<bool>,
    pending_selection_change: bool,
}

impl EditorEngine {
    pub fn new(
        registry: Arc<ComponentRegistry>,
        doc: TemplateDocument,
        theme: Theme,
        config: EngineConfig,
    ) -> Self {
        let mut ids = IdGenerator::new(&config.id_seed);
        skip_existing_ids(&mut ids, &doc);

        let indexes = build_indexes(&doc);
        let resolved_document_styles =
            resolve_document_styles(&theme.document_styles, doc.document_styles_override.as_ref());
        let resolved_page_settings =
            resolve_page_settings(&theme.page_settings, doc.page_settings_override.as_ref());

        info!(root = %doc.root, nodes = doc.nodes.len(), theme = %theme.id, "Editor engine created");

        Self {
            history: UndoStack::with_max_levels(config.max_undo_levels),
            registry,
            config,
            doc: Arc::new(doc),
            indexes: Arc::new(indexes),
            selection: None,
            theme,
            resolved_document_styles,
            resolved_page_settings,
            example_data: Value::Null,
            component_state: HashMap::new(),
            events: EventBus::new(),
            ids,
            pending_doc_change: None,
            pending_selection_change: false,
        }
    }

    /// Engine over a fresh document containing only the root
    pub fn with_default_document(registry: Arc<ComponentRegistry>, theme: Theme, config: EngineConfig) -> Self {
        let mut ids = IdGenerator::new(&config.id_seed);
        let doc = create_default_document(&registry, &mut ids);
        Self::new(registry, doc, theme, config)
    }

    /// Engine over a persisted document, checked before it is accepted
    pub fn from_json(
        registry: Arc<ComponentRegistry>,
        source: &str,
        theme: Theme,
        config: EngineConfig,
    ) -> Result<Self, EditorError> {
        let doc = TemplateDocument::from_json(source)?;
        validate_document(&doc, &registry)?;
        Ok(Self::new(registry, doc, theme, config))
    }

    // ---- Commands -------------------------------------------------------

    /// Apply a command to the current document
    ///
    /// A rejected command leaves the document, history and selection
    /// untouched.
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub fn dispatch(&mut self, command: Command, options: DispatchOptions) -> Result<(), CommandError> {
        let CommandOutcome {
            doc,
            inverse,
            structure_changed,
        } = match apply_command(&self.doc, &self.indexes, &command, &self.registry) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "Command rejected");
                return Err(err);
            }
        };

        self.install(doc, structure_changed);
        if !options.skip_undo {
            self.history
                .record(Box::new(CommandChange::new(inverse, command.name())));
        }
        self.flush();
        Ok(())
    }

    /// [`EditorEngine::dispatch`] with default options
    pub fn execute(&mut self, command: Command) -> Result<(), CommandError> {
        self.dispatch(command, DispatchOptions::default())
    }

    /// Create a detached node using the engine's ID sequence
    pub fn create_node(&mut self, node_type: &str, override_props: Option<&Value>) -> Result<CreatedNode, CommandError> {
        self.registry.create_node(node_type, override_props, &mut self.ids)
    }

    /// Create a node and insert it in one undoable step
    pub fn insert_new(
        &mut self,
        node_type: &str,
        slot_id: impl Into<SlotId>,
        index: Option<usize>,
        override_props: Option<&Value>,
    ) -> Result<NodeId, CommandError> {
        let created = self.create_node(node_type, override_props)?;
        let node_id = created.node.id.clone();
        self.execute(created.into_insert(slot_id, index))?;
        Ok(node_id)
    }

    // ---- History --------------------------------------------------------

    #[instrument(skip(self))]
    pub fn undo(&mut self) -> bool {
        let changed = self.step_undo();
        self.flush();
        changed
    }

    #[instrument(skip(self))]
    pub fn redo(&mut self) -> bool {
        let changed = self.step_redo();
        self.flush();
        changed
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    fn step_undo(&mut self) -> bool {
        match self.history.pop_undo() {
            Some(change) => {
                debug!(label = change.label(), "Undo step");
                change.undo_step(self)
            }
            None => false,
        }
    }

    fn step_redo(&mut self) -> bool {
        match self.history.pop_redo() {
            Some(change) => {
                debug!(label = change.label(), "Redo step");
                change.redo_step(self)
            }
            None => false,
        }
    }

    // ---- Text sessions --------------------------------------------------

    /// Start recording a rich-text session on `node_id`
    ///
    /// Continuing to type in a node whose session is still the newest undo
    /// entry keeps that entry.
    pub fn begin_text_session(&mut self, node_id: &str, ops: Rc<dyn TextChangeOps>) -> Result<(), EditorError> {
        if !self.doc.nodes.contains_key(node_id) {
            return Err(EditorError::UnknownNode(node_id.to_string()));
        }
        if self
            .history
            .peek_undo()
            .is_some_and(|change| change.continues_text_session(node_id))
        {
            return Ok(());
        }

        debug!(node_id, "Text session started");
        self.history.record(Box::new(TextChange::begin(node_id, ops)));
        Ok(())
    }

    /// Mirror live editor content into the node without touching history
    pub fn sync_text_content(&mut self, node_id: &str, content: Value) -> Result<(), EditorError> {
        if !self.doc.nodes.contains_key(node_id) {
            return Err(EditorError::UnknownNode(node_id.to_string()));
        }
        self.write_content(node_id, content);
        self.flush();
        Ok(())
    }

    // ---- Selection ------------------------------------------------------

    pub fn select_node(&mut self, node_id: Option<&str>) -> Result<(), EditorError> {
        if let Some(id) = node_id {
            if !self.doc.nodes.contains_key(id) {
                return Err(EditorError::UnknownNode(id.to_string()));
            }
        }
        self.set_selection(node_id.map(str::to_string));
        self.flush();
        Ok(())
    }

    pub fn selected_node(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Node IDs from the root down to `node_id`
    pub fn ancestor_path(&self, node_id: &str) -> Result<Vec<NodeId>, EditorError> {
        Ok(get_ancestor_path(&self.indexes, node_id)?)
    }

    /// Move the selection up to its ancestor at depth `level`
    pub fn expand_selection_to_level(&mut self, level: usize) -> Option<&str> {
        let target = self
            .selection
            .as_deref()
            .and_then(|id| find_ancestor_at_level(&self.indexes, id, level));
        if target.is_some() {
            self.set_selection(target);
            self.flush();
        }
        self.selected_node()
    }

    fn set_selection(&mut self, selection: Option<NodeId>) {
        if self.selection != selection {
            self.selection = selection;
            self.pending_selection_change = true;
        }
    }

    // ---- Theme and document --------------------------------------------

    pub fn set_theme(&mut self, theme: Theme) {
        info!(theme = %theme.id, "Theme changed");
        self.theme = theme;
        self.recompute_styles();
        self.mark_doc_change(false);
        self.flush();
    }

    /// Swap in a loaded document, discarding history and selection
    pub fn replace_document(&mut self, doc: TemplateDocument) -> Result<(), EditorError> {
        validate_document(&doc, &self.registry)?;
        info!(root = %doc.root, nodes = doc.nodes.len(), "Document replaced");

        self.history.clear();
        self.set_selection(None);
        skip_existing_ids(&mut self.ids, &doc);
        self.install(doc, true);
        self.flush();
        Ok(())
    }

    pub fn document(&self) -> Arc<TemplateDocument> {
        Arc::clone(&self.doc)
    }

    pub fn indexes(&self) -> Arc<DocumentIndexes> {
        Arc::clone(&self.indexes)
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn resolved_document_styles(&self) -> &StyleMap {
        &self.resolved_document_styles
    }

    pub fn resolved_page_settings(&self) -> &PageSettings {
        &self.resolved_page_settings
    }

    /// Effective styles of one node after the full cascade
    pub fn resolved_node_styles(&self, node_id: &str) -> Option<StyleMap> {
        let node = self.doc.node(node_id)?;
        let defaults = self
            .registry
            .get(&node.node_type)
            .map(|definition| &definition.default_styles);
        let preset = resolve_preset_styles(&self.theme, node.style_preset.as_deref());

        Some(resolve_node_styles(
            &self.resolved_document_styles,
            self.registry.inheritable_style_keys(),
            preset,
            node.styles.as_ref(),
            defaults,
        ))
    }

    // ---- Example data and component state ------------------------------

    pub fn set_example_data(&mut self, data: Value) {
        self.example_data = data;
        self.events.emit(&EditorEvent::ExampleChange);
    }

    pub fn example_data(&self) -> &Value {
        &self.example_data
    }

    pub fn set_component_state(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.component_state.insert(key.clone(), value);
        self.events.emit(&EditorEvent::ComponentStateChange { key });
    }

    pub fn component_state(&self, key: &str) -> Option<&Value> {
        self.component_state.get(key)
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // ---- Internals ------------------------------------------------------

    fn install(&mut self, doc: TemplateDocument, structure_changed: bool) {
        self.doc = Arc::new(doc);
        if structure_changed {
            self.indexes = Arc::new(build_indexes(&self.doc));
        }

        if let Some(selected) = &self.selection {
            if !self.doc.nodes.contains_key(selected) {
                debug!(node_id = %selected, "Selected node no longer exists");
                self.set_selection(None);
            }
        }

        self.recompute_styles();

        if self.config.freeze_check {
            if let Err(err) = self.doc.check_integrity() {
                error!(error = %err, "Document integrity violated after edit");
            }
        }

        self.mark_doc_change(structure_changed);
    }

    fn recompute_styles(&mut self) {
        self.resolved_document_styles = resolve_document_styles(
            &self.theme.document_styles,
            self.doc.document_styles_override.as_ref(),
        );
        self.resolved_page_settings = resolve_page_settings(
            &self.theme.page_settings,
            self.doc.page_settings_override.as_ref(),
        );
    }

    fn mark_doc_change(&mut self, structure_changed: bool) {
        let previous = self.pending_doc_change.unwrap_or(false);
        self.pending_doc_change = Some(previous || structure_changed);
    }

    /// Announce everything that changed since the last flush
    fn flush(&mut self) {
        if let Some(structure_changed) = self.pending_doc_change.take() {
            self.events
                .emit(&EditorEvent::DocChange { structure_changed });
        }
        if std::mem::take(&mut self.pending_selection_change) {
            let node_id = self.selection.clone();
            self.events.emit(&EditorEvent::SelectionChange { node_id });
        }
    }

    /// Write a node's `content` prop in place of the current snapshot
    fn write_content(&mut self, node_id: &str, content: Value) {
        let Some(node) = self.doc.node(node_id) else {
            warn!(node_id, "Content write for missing node ignored");
            return;
        };
        if node.prop("content") == Some(&content) {
            return;
        }

        let mut doc = (*self.doc).clone();
        if let Some(node) = doc.nodes.get_mut(node_id) {
            let props = node
                .props
                .get_or_insert_with(|| Value::Object(Map::new()));
            match props.as_object_mut() {
                Some(object) => {
                    object.insert("content".to_string(), content);
                }
                None => {
                    let mut object = Map::new();
                    object.insert("content".to_string(), content);
                    *props = Value::Object(object);
                }
            }
        }
        self.install(doc, false);
    }
}

fn skip_existing_ids(ids: &mut IdGenerator, doc: &TemplateDocument) {
    ids.skip_past(
        doc.nodes
            .keys()
            .chain(doc.slots.keys())
            .map(String::as_str),
    );
}

impl ChangeContext for EditorEngine {
    fn push_undo(&mut self, change: Box<dyn Change>) {
        self.history.push_undo(change);
    }

    fn push_redo(&mut self, change: Box<dyn Change>) {
        self.history.push_redo(change);
    }

    fn pop_undo(&mut self) -> Option<Box<dyn Change>> {
        self.history.pop_undo()
    }

    fn pop_redo(&mut self) -> Option<Box<dyn Change>> {
        self.history.pop_redo()
    }

    fn peek_undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    fn peek_redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    fn apply_silent(&mut self, command: &Command) -> Result<Command, CommandError> {
        let outcome = apply_command(&self.doc, &self.indexes, command, &self.registry)?;
        self.install(outcome.doc, outcome.structure_changed);
        Ok(outcome.inverse)
    }

    fn sync_content(&mut self, node_id: &str, content: Value) {
        self.write_content(node_id, content);
    }

    fn apply_snapshot(&mut self, node_id: &str, content: Value) {
        debug!(node_id, "Restoring text snapshot");
        self.write_content(node_id, content);
    }

    fn content_of(&self, node_id: &str) -> Option<Value> {
        self.doc.node(node_id)?.prop("content").cloned()
    }

    fn undo(&mut self) -> bool {
        self.step_undo()
    }

    fn redo(&mut self) -> bool {
        self.step_redo()
    }
}
