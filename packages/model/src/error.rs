//! Error types for the document model

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported model version {found} (expected {expected})")]
    UnsupportedModelVersion { found: u64, expected: u32 },

    #[error("Document integrity violated: {0}")]
    Integrity(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
