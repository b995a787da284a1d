//! # Blockform Model
//!
//! Value types shared by every Blockform crate: the template document tree,
//! themes and page settings.
//!
//! A [`TemplateDocument`] is a rooted tree of [`Node`]s connected through
//! named [`Slot`]s:
//!
//! ```text
//! root (node) ── body (slot) ─┬─ heading (text node)
//!                             └─ columns (node) ─┬─ column-0 (slot) ── …
//!                                                └─ column-1 (slot) ── …
//! ```
//!
//! Documents are plain values. Editing never mutates a snapshot in place;
//! the command layer in `blockform-editor` produces a new document per edit.

mod document;
mod error;
mod theme;

pub use document::{Node, NodeId, Slot, SlotId, TemplateDocument, MODEL_VERSION};
pub use error::{ModelError, ModelResult};
pub use theme::{
    BlockStylePreset, Margins, Orientation, PageFormat, PageSettings, PageSettingsOverride,
    StyleMap, Theme,
};
