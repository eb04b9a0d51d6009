//! Validated, in-memory sequence examples.

use ndarray::Array2;

use crate::error::{DataError, Result};
use crate::record::EncodedRecord;
use frnn_core::Split;

/// One moving-window series instance.
///
/// All matrices have exactly `length` rows; padding only exists inside a
/// [`SequenceBatch`](crate::SequenceBatch).
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceExample {
    length: usize,
    input: Array2<f32>,
    output: Option<Array2<f32>>,
    metadata: Option<Array2<f32>>,
}

impl SequenceExample {
    /// Build an example from its parts, checking every width.
    ///
    /// # Errors
    ///
    /// Returns a format error if the length is zero or a matrix has the wrong
    /// number of rows.
    pub fn new(
        input: Array2<f32>,
        output: Option<Array2<f32>>,
        metadata: Option<Array2<f32>>,
    ) -> Result<Self> {
        let length = input.nrows();
        if length == 0 {
            return Err(DataError::format(0, "sequence length must be at least 1"));
        }
        for (name, matrix) in [("output", &output), ("metadata", &metadata)] {
            if let Some(m) = matrix {
                if m.nrows() != length {
                    return Err(DataError::format(
                        0,
                        format!("{name} has {} rows, input has {length}", m.nrows()),
                    ));
                }
            }
        }
        Ok(Self {
            length,
            input,
            output,
            metadata,
        })
    }

    /// Decode a stored record for the given split and sizes.
    ///
    /// `index` is the record position, used in error messages.
    ///
    /// # Errors
    ///
    /// Returns a format error when a required field is missing or any row
    /// width disagrees with `input_size` / `output_size`.
    pub fn from_record(
        record: EncodedRecord,
        split: Split,
        input_size: usize,
        output_size: usize,
        index: usize,
    ) -> Result<Self> {
        let length = record.length;
        if length == 0 {
            return Err(DataError::format(index, "sequence length must be at least 1"));
        }

        let input = rows_to_matrix(record.input, length, input_size, "input", index)?;

        let output = match (record.output, split.requires_output()) {
            (Some(rows), true) => Some(rows_to_matrix(rows, length, output_size, "output", index)?),
            (None, true) => {
                return Err(DataError::format(
                    index,
                    format!("{split} records must carry output rows"),
                ))
            }
            (_, false) => None,
        };

        let metadata = match (record.metadata, split.requires_metadata()) {
            (Some(rows), true) => Some(rows_to_matrix(
                rows,
                length,
                output_size + 1,
                "metadata",
                index,
            )?),
            (None, true) => {
                return Err(DataError::format(
                    index,
                    format!("{split} records must carry metadata rows"),
                ))
            }
            (_, false) => None,
        };

        Ok(Self {
            length,
            input,
            output,
            metadata,
        })
    }

    /// True sequence length.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Input rows, `(length, input_size)`.
    pub fn input(&self) -> &Array2<f32> {
        &self.input
    }

    /// Target rows, `(length, output_size)`.
    pub fn output(&self) -> Option<&Array2<f32>> {
        self.output.as_ref()
    }

    /// Level and seasonality rows, `(length, output_size + 1)`.
    pub fn metadata(&self) -> Option<&Array2<f32>> {
        self.metadata.as_ref()
    }

    /// Number of input features per step.
    pub fn input_size(&self) -> usize {
        self.input.ncols()
    }
}

fn rows_to_matrix(
    rows: Vec<Vec<f32>>,
    length: usize,
    width: usize,
    field: &str,
    index: usize,
) -> Result<Array2<f32>> {
    if rows.len() != length {
        return Err(DataError::format(
            index,
            format!("{field} has {} rows but length is {length}", rows.len()),
        ));
    }
    let mut flat = Vec::with_capacity(length * width);
    for (t, row) in rows.into_iter().enumerate() {
        if row.len() != width {
            return Err(DataError::format(
                index,
                format!("{field} row {t} has {} values, expected {width}", row.len()),
            ));
        }
        flat.extend(row);
    }
    Array2::from_shape_vec((length, width), flat)
        .map_err(|e| DataError::format(index, format!("{field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> EncodedRecord {
        EncodedRecord {
            length: 2,
            input: vec![vec![0.1, 0.2, 0.3], vec![0.2, 0.3, 0.4]],
            output: Some(vec![vec![0.4, 0.5], vec![0.5, 0.6]]),
            metadata: Some(vec![vec![1.0, 0.0, 0.1], vec![1.1, 0.0, 0.1]]),
        }
    }

    #[test]
    fn test_validation_record() {
        let example = SequenceExample::from_record(valid_record(), Split::Valid, 3, 2, 0).unwrap();
        assert_eq!(example.length(), 2);
        assert_eq!(example.input().dim(), (2, 3));
        assert_eq!(example.output().unwrap().dim(), (2, 2));
        assert_eq!(example.metadata().unwrap().dim(), (2, 3));
    }

    #[test]
    fn test_train_split_drops_metadata() {
        let example = SequenceExample::from_record(valid_record(), Split::Train, 3, 2, 0).unwrap();
        assert!(example.metadata().is_none());
    }

    #[test]
    fn test_inconsistent_width_fails_fast() {
        let mut record = valid_record();
        record.input[1].pop();
        let err = SequenceExample::from_record(record, Split::Valid, 3, 2, 7).unwrap_err();
        assert!(matches!(err, DataError::FormatError { record: 7, .. }));
        assert!(err.to_string().contains("input row 1"));
    }

    #[test]
    fn test_missing_metadata_for_test_split() {
        let mut record = valid_record();
        record.metadata = None;
        assert!(SequenceExample::from_record(record, Split::Test, 3, 2, 0).is_err());
    }

    #[test]
    fn test_row_count_must_match_length() {
        let mut record = valid_record();
        record.length = 3;
        assert!(SequenceExample::from_record(record, Split::Train, 3, 2, 0).is_err());
    }
}
