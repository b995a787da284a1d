use blockform_model::ModelError;
use thiserror::Error;

/// Common error type shared by the Blockform crates
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Generic error: {0}")]
    Generic(String),
}

pub type CommonResult<T> = Result<T, CommonError>;
