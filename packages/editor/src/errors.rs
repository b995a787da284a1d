//! Error types for the editor

use crate::commands::CommandError;
use crate::indexes::IndexError;
use crate::validation::ValidationError;
use blockform_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Command rejected: {0}")]
    Command(#[from] CommandError),

    #[error("Invalid document: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Unknown node: {0}")]
    UnknownNode(String),
}
