//! Error types for frnn_data.

use thiserror::Error;

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while reading records or assembling batches.
#[derive(Error, Debug)]
pub enum DataError {
    /// A record is malformed or inconsistent with the declared sizes.
    #[error("Record {record}: {reason}")]
    FormatError {
        /// Zero-based position of the record in its file.
        record: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A frame checksum does not match its contents.
    #[error("Record {record}: checksum mismatch in {part}")]
    ChecksumMismatch {
        /// Zero-based position of the record in its file.
        record: usize,
        /// Which part of the frame failed (`length` or `payload`).
        part: &'static str,
    },

    /// The file ended in the middle of a frame.
    #[error("Record {record}: file is truncated")]
    Truncated {
        /// Zero-based position of the record in its file.
        record: usize,
    },

    /// Invalid data shape while collating a batch.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Empty dataset.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Batch size error.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// JSON payload error.
    #[error("Record {record}: invalid payload: {source}")]
    Payload {
        /// Zero-based position of the record in its file.
        record: usize,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DataError {
    pub(crate) fn format(record: usize, reason: impl Into<String>) -> Self {
        Self::FormatError {
            record,
            reason: reason.into(),
        }
    }
}
