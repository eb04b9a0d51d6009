//! Padded minibatches of variable-length sequences.

use ndarray::{s, Array2, Array3, ArrayView2, Axis};

use crate::error::{DataError, Result};
use crate::example::SequenceExample;

/// A minibatch padded to its own longest sequence.
///
/// Arrays are `(B, T, F)` with `T = max(lengths)`. Rows at or beyond an
/// example's length are zero and must never be read; use
/// [`SequenceBatch::final_step`] to pick the last valid row per example.
#[derive(Debug, Clone)]
pub struct SequenceBatch {
    /// True length of every example.
    pub lengths: Vec<usize>,
    /// Padded inputs, `(B, T, input_size)`.
    pub inputs: Array3<f32>,
    /// Padded targets, `(B, T, output_size)`, absent for test records.
    pub targets: Option<Array3<f32>>,
    /// Padded level/seasonality rows, `(B, T, output_size + 1)`, absent for train records.
    pub metadata: Option<Array3<f32>>,
}

impl SequenceBatch {
    /// Pad a group of examples into one batch.
    ///
    /// Targets and metadata are only kept when every example carries them.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty group or mismatched feature widths.
    pub fn collate(examples: &[&SequenceExample]) -> Result<Self> {
        let first = examples.first().ok_or(DataError::EmptyDataset)?;
        let batch_size = examples.len();
        let max_length = examples.iter().map(|e| e.length()).max().unwrap_or(0);
        let lengths: Vec<usize> = examples.iter().map(|e| e.length()).collect();

        let inputs = pad(
            examples.iter().map(|e| Some(e.input().view())),
            batch_size,
            max_length,
            first.input_size(),
            "input",
        )?;

        let targets = match first.output() {
            Some(o) if examples.iter().all(|e| e.output().is_some()) => Some(pad(
                examples.iter().map(|e| e.output().map(|m| m.view())),
                batch_size,
                max_length,
                o.ncols(),
                "output",
            )?),
            _ => None,
        };

        let metadata = match first.metadata() {
            Some(m) if examples.iter().all(|e| e.metadata().is_some()) => Some(pad(
                examples.iter().map(|e| e.metadata().map(|m| m.view())),
                batch_size,
                max_length,
                m.ncols(),
                "metadata",
            )?),
            _ => None,
        };

        Ok(Self {
            lengths,
            inputs,
            targets,
            metadata,
        })
    }

    /// Number of examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Check if the batch holds no examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Padded length shared by every example of the batch.
    #[must_use]
    pub fn padded_length(&self) -> usize {
        self.inputs.shape()[1]
    }

    /// Indices of the last valid row, `length - 1` per example.
    #[must_use]
    pub fn last_indices(&self) -> Vec<usize> {
        self.lengths.iter().map(|&l| l - 1).collect()
    }

    /// Row at `length - 1` of every example, `(B, F)`.
    #[must_use]
    pub fn final_step(&self, padded: &Array3<f32>) -> Array2<f32> {
        final_step(padded, &self.lengths)
    }
}

/// Pick row `lengths[i] - 1` of example `i`.
///
/// # Panics
///
/// Panics if a length is zero or larger than the padded length.
#[must_use]
pub fn final_step(padded: &Array3<f32>, lengths: &[usize]) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros((lengths.len(), padded.shape()[2]));
    for (i, &length) in lengths.iter().enumerate() {
        out.row_mut(i).assign(&padded.slice(s![i, length - 1, ..]));
    }
    out
}

fn pad<'a>(
    rows: impl Iterator<Item = Option<ArrayView2<'a, f32>>>,
    batch_size: usize,
    max_length: usize,
    width: usize,
    field: &str,
) -> Result<Array3<f32>> {
    let mut padded = Array3::<f32>::zeros((batch_size, max_length, width));
    for (i, matrix) in rows.enumerate() {
        let matrix = matrix
            .ok_or_else(|| DataError::InvalidShape(format!("example {i} has no {field} rows")))?;
        if matrix.ncols() != width {
            return Err(DataError::InvalidShape(format!(
                "example {i} {field} has {} columns, batch expects {width}",
                matrix.ncols()
            )));
        }
        padded
            .index_axis_mut(Axis(0), i)
            .slice_mut(s![..matrix.nrows(), ..])
            .assign(&matrix);
    }
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn example(length: usize, value: f32) -> SequenceExample {
        let input = Array2::from_shape_fn((length, 2), |(t, f)| value + t as f32 + f as f32 * 0.1);
        let output = Array2::from_shape_fn((length, 1), |(t, _)| value + t as f32);
        SequenceExample::new(input, Some(output), None).unwrap()
    }

    #[test]
    fn test_pads_to_batch_max_not_global_max() {
        let a = example(3, 0.0);
        let b = example(5, 10.0);
        let batch = SequenceBatch::collate(&[&a, &b]).unwrap();

        assert_eq!(batch.lengths, vec![3, 5]);
        assert_eq!(batch.inputs.dim(), (2, 5, 2));
        assert_eq!(batch.padded_length(), 5);
        // Padding rows are zero.
        assert_eq!(batch.inputs[[0, 3, 0]], 0.0);
        assert_eq!(batch.inputs[[0, 4, 1]], 0.0);
        assert!(batch.metadata.is_none());
    }

    #[test]
    fn test_final_step_boundaries() {
        let short = example(1, 0.0);
        let full = example(4, 100.0);
        let batch = SequenceBatch::collate(&[&short, &full]).unwrap();

        let targets = batch.targets.as_ref().unwrap();
        let last = batch.final_step(targets);
        // length 1 selects index 0, length == padded length selects the final row
        assert_eq!(last[[0, 0]], 0.0);
        assert_eq!(last[[1, 0]], 103.0);
        assert_eq!(batch.last_indices(), vec![0, 3]);
    }

    #[test]
    fn test_empty_group_is_rejected() {
        assert!(matches!(
            SequenceBatch::collate(&[]),
            Err(DataError::EmptyDataset)
        ));
    }
}
