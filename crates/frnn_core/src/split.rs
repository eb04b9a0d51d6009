//! Data split types for train/validation/test record files.

use serde::{Deserialize, Serialize};

/// Which record file a sequence example came from.
///
/// The split decides which fields a record must carry:
///
/// | split | input | output | metadata |
/// |-------|-------|--------|----------|
/// | Train | yes   | yes    | no       |
/// | Valid | yes   | yes    | yes      |
/// | Test  | yes   | no     | yes      |
///
/// ```rust
/// use frnn_core::Split;
///
/// assert!(Split::Train.requires_output());
/// assert!(!Split::Train.requires_metadata());
/// assert!(Split::Test.requires_metadata());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Split {
    /// Training records: noisy inputs and targets.
    #[default]
    Train,
    /// Validation records: targets plus level/seasonality metadata for scoring.
    Valid,
    /// Test records: inputs plus metadata, forecasts are produced for them.
    Test,
}

impl Split {
    /// Whether records of this split carry target rows.
    #[must_use]
    pub const fn requires_output(&self) -> bool {
        matches!(self, Split::Train | Split::Valid)
    }

    /// Whether records of this split carry level/seasonality rows.
    #[must_use]
    pub const fn requires_metadata(&self) -> bool {
        matches!(self, Split::Valid | Split::Test)
    }

    /// Short lowercase name used in log lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "validation",
            Split::Test => "test",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        assert!(Split::Valid.requires_output());
        assert!(Split::Valid.requires_metadata());
        assert!(!Split::Test.requires_output());
    }

    #[test]
    fn test_display() {
        assert_eq!(Split::Valid.to_string(), "validation");
        assert_eq!(Split::default(), Split::Train);
    }
}
