//! # Undo/Redo Stack
//!
//! Storage for the two history stacks. Stepping logic lives in the entries
//! themselves (see [`crate::change`]); this type only keeps the stacks in
//! order and bounded.
//!
//! ## Rules
//!
//! - Recording a new forward action clears the redo stack
//! - Entries re-attached during a step never clear the redo stack
//! - The undo stack keeps at most `max_levels` entries, dropping the oldest
//!   (0 = unlimited)

use crate::change::Change;

pub const DEFAULT_MAX_UNDO_LEVELS: usize = 100;

#[derive(Debug)]
pub struct UndoStack {
    /// Most recent last
    undo_stack: Vec<Box<dyn Change>>,

    /// Most recently undone last
    redo_stack: Vec<Box<dyn Change>>,

    max_levels: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_MAX_UNDO_LEVELS)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a new forward action
    pub fn record(&mut self, change: Box<dyn Change>) {
        self.push_undo(change);
        self.redo_stack.clear();
    }

    pub fn push_undo(&mut self, change: Box<dyn Change>) {
        self.undo_stack.push(change);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
    }

    pub fn push_redo(&mut self, change: Box<dyn Change>) {
        self.redo_stack.push(change);
    }

    pub fn pop_undo(&mut self) -> Option<Box<dyn Change>> {
        self.undo_stack.pop()
    }

    pub fn pop_redo(&mut self) -> Option<Box<dyn Change>> {
        self.redo_stack.pop()
    }

    pub fn peek_undo(&self) -> Option<&dyn Change> {
        self.undo_stack.last().map(|change| change.as_ref())
    }

    pub fn peek_redo(&self) -> Option<&dyn Change> {
        self.redo_stack.last().map(|change| change.as_ref())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Label of the entry the next undo will step
    pub fn undo_label(&self) -> Option<&str> {
        self.peek_undo().map(|change| change.label())
    }

    /// Label of the entry the next redo will step
    pub fn redo_label(&self) -> Option<&str> {
        self.peek_redo().map(|change| change.label())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
