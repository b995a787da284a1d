//! Rich-text editing sessions as a single undo entry
//!
//! The external text editor keeps its own history and exposes a
//! monotonically increasing undo depth. A [`TextChange`] remembers the depth
//! at which its session began (and, once first undone, where it ended) and
//! translates engine undo/redo into native steps inside that range. Once the
//! range is exhausted the step falls through to the neighbouring entry.
//!
//! When the editor surface has been destroyed the native history is gone,
//! so the entry writes the stored start or end content in one step.

use crate::change::{Change, ChangeContext};
use blockform_model::NodeId;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Handle onto a live rich-text editor instance
pub trait TextChangeOps {
    /// Whether the editor surface still exists
    fn is_alive(&self) -> bool;

    /// Perform one native undo
    fn undo(&self);

    /// Perform one native redo
    fn redo(&self);

    /// Current depth of the native undo history
    fn undo_depth(&self) -> usize;

    /// Current document content of the editor
    fn get_content(&self) -> Value;
}

pub const TEXT_CHANGE_LABEL: &str = "edit-text";

pub struct TextChange {
    node_id: NodeId,
    ops: Rc<dyn TextChangeOps>,
    start_depth: usize,
    start_content: Value,

    /// Captured on first undo
    end: Option<(usize, Value)>,
}

impl TextChange {
    /// Open a session on `node_id` at the editor's current depth and content
    pub fn begin(node_id: impl Into<NodeId>, ops: Rc<dyn TextChangeOps>) -> Self {
        let start_depth = ops.undo_depth();
        let start_content = ops.get_content();
        Self {
            node_id: node_id.into(),
            ops,
            start_depth,
            start_content,
            end: None,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn start_depth(&self) -> usize {
        self.start_depth
    }

    pub fn end_depth(&self) -> Option<usize> {
        self.end.as_ref().map(|(depth, _)| *depth)
    }

    fn capture_end(&mut self, ctx: &dyn ChangeContext) {
        if self.end.is_some() {
            return;
        }
        self.end = Some(if self.ops.is_alive() {
            (self.ops.undo_depth(), self.ops.get_content())
        } else {
            let content = ctx
                .content_of(&self.node_id)
                .unwrap_or_else(|| self.start_content.clone());
            (self.start_depth, content)
        });
    }
}

impl fmt::Debug for TextChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextChange")
            .field("node_id", &self.node_id)
            .field("start_depth", &self.start_depth)
            .field("end_depth", &self.end_depth())
            .field("alive", &self.ops.is_alive())
            .finish()
    }
}

impl Change for TextChange {
    fn undo_step(mut self: Box<Self>, ctx: &mut dyn ChangeContext) -> bool {
        self.capture_end(ctx);

        if !self.ops.is_alive() {
            let content = self.start_content.clone();
            ctx.apply_snapshot(&self.node_id, content);
            ctx.push_redo(self);
            return true;
        }

        if self.ops.undo_depth() <= self.start_depth {
            ctx.push_redo(self);
            return ctx.undo();
        }

        self.ops.undo();
        ctx.sync_content(&self.node_id, self.ops.get_content());

        if self.ops.undo_depth() > self.start_depth {
            ctx.push_undo(self);
        } else {
            ctx.push_redo(self);
        }
        true
    }

    fn redo_step(self: Box<Self>, ctx: &mut dyn ChangeContext) -> bool {
        let Some((end_depth, end_content)) = self.end.clone() else {
            // Never undone, so there is nothing to replay
            ctx.push_undo(self);
            return ctx.redo();
        };

        if !self.ops.is_alive() {
            ctx.apply_snapshot(&self.node_id, end_content);
            ctx.push_undo(self);
            return true;
        }

        if self.ops.undo_depth() >= end_depth {
            ctx.push_undo(self);
            return ctx.redo();
        }

        self.ops.redo();
        ctx.sync_content(&self.node_id, self.ops.get_content());

        if self.ops.undo_depth() < end_depth {
            ctx.push_redo(self);
        } else {
            ctx.push_undo(self);
        }
        true
    }

    fn label(&self) -> &str {
        TEXT_CHANGE_LABEL
    }

    fn continues_text_session(&self, node_id: &str) -> bool {
        self.end.is_none() && self.node_id == node_id
    }
}
