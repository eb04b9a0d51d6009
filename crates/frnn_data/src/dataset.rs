//! In-memory collection of validated sequence examples.

use std::path::Path;

use crate::error::{DataError, Result};
use crate::example::SequenceExample;
use crate::record::RecordReader;
use frnn_core::Split;

/// All examples of one record file.
///
/// # Example
///
/// ```rust,ignore
/// use frnn_core::Split;
/// use frnn_data::SequenceDataset;
///
/// let train = SequenceDataset::load("train.tfrecords", Split::Train, 15, 12)?;
/// println!("{} windows", train.len());
/// ```
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    examples: Vec<SequenceExample>,
    split: Split,
    input_size: usize,
    output_size: usize,
}

impl SequenceDataset {
    /// Read and validate every record of a file.
    ///
    /// Reading stops at the first malformed record; no partial dataset is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failures, framing or checksum errors, and
    /// records that disagree with `input_size` / `output_size`.
    pub fn load<P: AsRef<Path>>(
        path: P,
        split: Split,
        input_size: usize,
        output_size: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let reader = RecordReader::open(path)?;

        let mut examples = Vec::new();
        for (index, record) in reader.enumerate() {
            let example =
                SequenceExample::from_record(record?, split, input_size, output_size, index)?;
            examples.push(example);
        }

        tracing::debug!(
            "Loaded {} {} records from {}",
            examples.len(),
            split,
            path.display()
        );

        Self::from_examples(examples, split, input_size, output_size)
    }

    /// Wrap already-built examples, checking their widths.
    ///
    /// # Errors
    ///
    /// Returns a format error naming the first inconsistent example.
    pub fn from_examples(
        examples: Vec<SequenceExample>,
        split: Split,
        input_size: usize,
        output_size: usize,
    ) -> Result<Self> {
        for (index, example) in examples.iter().enumerate() {
            if example.input_size() != input_size {
                return Err(DataError::format(
                    index,
                    format!(
                        "input has {} features, expected {input_size}",
                        example.input_size()
                    ),
                ));
            }
            if split.requires_output() {
                match example.output() {
                    Some(o) if o.ncols() == output_size => {}
                    Some(o) => {
                        return Err(DataError::format(
                            index,
                            format!("output has {} columns, expected {output_size}", o.ncols()),
                        ))
                    }
                    None => return Err(DataError::format(index, "missing output rows")),
                }
            }
            if split.requires_metadata() {
                match example.metadata() {
                    Some(m) if m.ncols() == output_size + 1 => {}
                    Some(m) => {
                        return Err(DataError::format(
                            index,
                            format!(
                                "metadata has {} columns, expected {}",
                                m.ncols(),
                                output_size + 1
                            ),
                        ))
                    }
                    None => return Err(DataError::format(index, "missing metadata rows")),
                }
            }
        }

        Ok(Self {
            examples,
            split,
            input_size,
            output_size,
        })
    }

    /// Number of examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Check if the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Example at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SequenceExample> {
        self.examples.get(index)
    }

    /// All examples in file order.
    #[must_use]
    pub fn examples(&self) -> &[SequenceExample] {
        &self.examples
    }

    /// Split the records were read as.
    #[must_use]
    pub fn split(&self) -> Split {
        self.split
    }

    /// Input features per step.
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Forecast horizon.
    #[must_use]
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Longest true length in the dataset.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.examples.iter().map(SequenceExample::length).max().unwrap_or(0)
    }
}
