use sluice_engine::TransformError;
use sluice_traits::ResourceError;
use thiserror::Error;

/// Errors surfaced by the [`crate::Transformer`] driver.
#[derive(Error, Debug)]
pub enum SluiceError {
    #[error("Transformation failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SluiceError {
    /// The error code of an underlying transformation failure, if any.
    pub fn error_code(&self) -> Option<String> {
        match self {
            SluiceError::Transform(e) => e.error_code(),
            _ => None,
        }
    }
}
