//! Error types for frnn_core.

use thiserror::Error;

/// Result type alias using [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fatal configuration problems.
///
/// These are raised before any data is read or any parameter is initialized,
/// and always name the offending key or value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required hyperparameter key is absent from the mapping.
    #[error("Missing required hyperparameter '{0}'")]
    MissingKey(String),

    /// A hyperparameter is present but its value cannot be used.
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The optimizer name is not in the registry.
    #[error("Unknown optimizer '{0}' (expected one of: adagrad, adam, cocob)")]
    UnknownOptimizer(String),

    /// A textual tag (cell type, model family, window mode) is not recognised.
    #[error("Unknown {kind} '{value}'")]
    UnknownName {
        /// What kind of tag was being parsed.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The model family and input window mode have no trainer.
    #[error("No trainer for model family '{family}' with input format '{window_mode}'")]
    UnsupportedModel {
        /// Model family tag.
        family: String,
        /// Input window mode tag.
        window_mode: String,
    },
}
