//! Error types for frnn_models.

use thiserror::Error;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while moving data between the host and a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Tensor contents could not be read back.
    #[error("Tensor conversion failed: {0}")]
    Conversion(String),

    /// A host array does not match the model's expected layout.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}
