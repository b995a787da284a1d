//! Data-binding previews for the inspector
//!
//! Expressions are evaluated by an external engine against the example data.
//! A failing expression yields an error preview; it never reaches the
//! document or the caller as an `Err`.

use serde_json::Value;
use tracing::debug;

/// Expression language supplied by the host
pub trait ExpressionEvaluator {
    fn evaluate(&self, expression: &str, data: &Value) -> Result<Value, String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindingPreview {
    Value(Value),
    Error(String),
}

impl BindingPreview {
    pub fn is_error(&self) -> bool {
        matches!(self, BindingPreview::Error(_))
    }
}

pub fn preview_binding(evaluator: &dyn ExpressionEvaluator, expression: &str, data: &Value) -> BindingPreview {
    match evaluator.evaluate(expression, data) {
        Ok(value) => BindingPreview::Value(value),
        Err(message) => {
            debug!(expression, error = %message, "Binding preview failed");
            BindingPreview::Error(message)
        }
    }
}
