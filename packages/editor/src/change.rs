//! # Undo Entries
//!
//! Every entry on the undo or redo stack is a [`Change`]. The engine detaches
//! the top entry before stepping it, and the entry decides which stack it
//! belongs on afterwards: a command entry always crosses to the opposite
//! stack, while a text session may stay put for several steps.
//!
//! Stepping an entry that has nothing left to do hands control to the next
//! entry through [`ChangeContext::undo`] / [`ChangeContext::redo`].

use crate::commands::{Command, CommandError};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// An entry in the undo timeline
pub trait Change: fmt::Debug {
    /// Step backwards. Returns whether anything changed.
    fn undo_step(self: Box<Self>, ctx: &mut dyn ChangeContext) -> bool;

    /// Step forwards. Returns whether anything changed.
    fn redo_step(self: Box<Self>, ctx: &mut dyn ChangeContext) -> bool;

    fn label(&self) -> &str;

    /// Whether new typing in `node_id` should extend this entry instead of
    /// opening a new one
    fn continues_text_session(&self, _node_id: &str) -> bool {
        false
    }
}

/// Engine surface available to a stepping [`Change`]
pub trait ChangeContext {
    fn push_undo(&mut self, change: Box<dyn Change>);
    fn push_redo(&mut self, change: Box<dyn Change>);
    fn pop_undo(&mut self) -> Option<Box<dyn Change>>;
    fn pop_redo(&mut self) -> Option<Box<dyn Change>>;
    fn peek_undo_label(&self) -> Option<&str>;
    fn peek_redo_label(&self) -> Option<&str>;

    /// Apply a command without recording history; returns its inverse
    fn apply_silent(&mut self, command: &Command) -> Result<Command, CommandError>;

    /// Mirror live editor content into the node's `content` prop
    fn sync_content(&mut self, node_id: &str, content: Value);

    /// Write stored content when the live editor is gone
    fn apply_snapshot(&mut self, node_id: &str, content: Value);

    /// Current `content` prop of a node
    fn content_of(&self, node_id: &str) -> Option<Value>;

    /// Step the next undo entry
    fn undo(&mut self) -> bool;

    /// Step the next redo entry
    fn redo(&mut self) -> bool;
}

/// Undo entry wrapping a single command
///
/// Stepping applies the stored command and replaces the entry with one
/// holding the inverse on the opposite stack.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandChange {
    command: Command,
    label: String,
}

impl CommandChange {
    pub fn new(command: Command, label: impl Into<String>) -> Self {
        Self {
            command,
            label: label.into(),
        }
    }

    /// The command this entry applies when stepped
    pub fn command(&self) -> &Command {
        &self.command
    }
}

impl Change for CommandChange {
    fn undo_step(self: Box<Self>, ctx: &mut dyn ChangeContext) -> bool {
        match ctx.apply_silent(&self.command) {
            Ok(inverse) => {
                ctx.push_redo(Box::new(CommandChange::new(inverse, self.label)));
                true
            }
            Err(err) => {
                warn!(label = %self.label, error = %err, "Dropping undo entry that no longer applies");
                ctx.undo()
            }
        }
    }

    fn redo_step(self: Box<Self>, ctx: &mut dyn ChangeContext) -> bool {
        match ctx.apply_silent(&self.command) {
            Ok(inverse) => {
                ctx.push_undo(Box::new(CommandChange::new(inverse, self.label)));
                true
            }
            Err(err) => {
                warn!(label = %self.label, error = %err, "Dropping redo entry that no longer applies");
                ctx.redo()
            }
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}
