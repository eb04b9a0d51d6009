//! Error types for training.

use thiserror::Error;

/// Result type alias for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Errors that can occur while training, validating or testing a model.
#[derive(Error, Debug)]
pub enum TrainError {
    /// Bad hyperparameters, optimizer or model selection.
    #[error("Configuration error: {0}")]
    Config(#[from] frnn_core::ConfigError),

    /// Record or batch error.
    #[error("Data error: {0}")]
    DataError(#[from] frnn_data::DataError),

    /// Moving tensors to or from the host failed.
    #[error("Model error: {0}")]
    ModelError(#[from] frnn_models::ModelError),

    /// A batch lacked a field the pass needs.
    #[error("Forward pass failed: {0}")]
    ForwardError(String),

    /// The validation or test file produced no batches.
    #[error("No {0} batches to evaluate")]
    NothingToEvaluate(&'static str),

    /// Training was interrupted.
    #[error("Training interrupted: {0}")]
    Interrupted(String),
}
