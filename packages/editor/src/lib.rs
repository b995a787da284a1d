//! # Blockform Editor
//!
//! Headless editing engine for block-based document templates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ registry: block types, slots, containment    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ commands: pure edits + inverse commands      │
//! │ indexes:  parent/depth lookups per snapshot  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ engine: snapshot, undo timeline, selection,  │
//! │         resolved styles, events              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are values**: every edit produces a new document
//! 2. **Every edit has an inverse**: undo re-applies it through the same path
//! 3. **One timeline**: structural edits and rich-text sessions share a stack
//! 4. **The registry decides legality**: commands consult nothing else
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blockform_editor::{builtin_registry, EditorEngine, EngineConfig};
//! use blockform_model::Theme;
//! use std::sync::Arc;
//!
//! let mut engine = EditorEngine::with_default_document(
//!     Arc::new(builtin_registry()),
//!     Theme::default(),
//!     EngineConfig::default(),
//! );
//!
//! let doc = engine.document();
//! let body = doc.node(&doc.root).unwrap().slots[0].clone();
//! let text = engine.insert_new("text", body, None, None)?;
//!
//! engine.undo();
//! engine.redo();
//! ```

mod builtin;
mod change;
mod commands;
mod config;
mod engine;
mod errors;
mod events;
mod indexes;
mod preview;
mod registry;
mod styles;
mod text_change;
mod undo_stack;
mod validation;

pub use builtin::{builtin_registry, register_builtin_components, SET_COLUMN_COUNT};
pub use change::{Change, ChangeContext, CommandChange};
pub use commands::{
    apply_command, collect_subtree, CapturedSubtree, Command, CommandError, CommandOutcome,
    RemovedColumn,
};
pub use config::EngineConfig;
pub use engine::{create_default_document, DispatchOptions, EditorEngine};
pub use errors::EditorError;
pub use events::{EditorEvent, EventBus, EventHandler, EventKind, SubscriptionId};
pub use indexes::{
    build_indexes, find_ancestor_at_level, get_ancestor_path, get_node_depth, is_ancestor,
    DocumentIndexes, IndexError,
};
pub use preview::{preview_binding, BindingPreview, ExpressionEvaluator};
pub use registry::{
    merge_props, slot_id_for, AllowedChildren, ComponentCommandContext, ComponentDefinition,
    ComponentHooks, ComponentRegistry, CreatedNode, MultiSlotConfig, Subtree,
    DEFAULT_INHERITABLE_STYLE_KEYS, MAX_MULTI_SLOTS,
};
pub use styles::{
    resolve_document_styles, resolve_node_styles, resolve_page_settings, resolve_preset_styles,
};
pub use text_change::{TextChange, TextChangeOps, TEXT_CHANGE_LABEL};
pub use undo_stack::{UndoStack, DEFAULT_MAX_UNDO_LEVELS};
pub use validation::{validate_document, ValidationError};
