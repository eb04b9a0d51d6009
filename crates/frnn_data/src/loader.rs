//! Minibatch providers for training epochs and evaluation passes.

use crate::batch::SequenceBatch;
use crate::dataset::SequenceDataset;
use crate::error::{DataError, Result};
use crate::shuffle::{ShuffleRepeat, SHUFFLE_BUFFER_SIZE};
use frnn_core::Seed;

/// Produces padded minibatches from a dataset.
///
/// Training epochs draw `repeats` buffered-shuffle passes over the dataset
/// and batch them; every call to [`SequenceLoader::epoch`] starts a fresh,
/// independently seeded stream. Evaluation passes batch the records once, in
/// file order. Both iterators end with `None` when the data is exhausted.
///
/// # Example
///
/// ```rust,ignore
/// use frnn_core::Seed;
/// use frnn_data::{SequenceDataset, SequenceLoader};
///
/// let loader = SequenceLoader::builder(train)
///     .batch_size(32)
///     .repeats(5)
///     .build()?;
///
/// for epoch in 0..10 {
///     for batch in loader.epoch(run_seed.for_epoch(epoch)) {
///         let batch = batch?;
///         // one optimizer step
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SequenceLoader {
    dataset: SequenceDataset,
    batch_size: usize,
    repeats: usize,
    buffer_size: usize,
}

impl SequenceLoader {
    /// Create a new loader builder.
    #[must_use]
    pub fn builder(dataset: SequenceDataset) -> SequenceLoaderBuilder {
        SequenceLoaderBuilder::new(dataset)
    }

    /// Get the dataset.
    #[must_use]
    pub fn dataset(&self) -> &SequenceDataset {
        &self.dataset
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Shuffle-repeats per training epoch.
    #[must_use]
    pub fn repeats(&self) -> usize {
        self.repeats
    }

    /// Number of minibatches in one training epoch.
    #[must_use]
    pub fn epoch_batches(&self) -> usize {
        (self.dataset.len() * self.repeats).div_ceil(self.batch_size)
    }

    /// Number of minibatches in one evaluation pass.
    #[must_use]
    pub fn ordered_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Start a training epoch shuffled with `seed`.
    #[must_use]
    pub fn epoch(&self, seed: Seed) -> EpochBatches<'_> {
        EpochBatches {
            loader: self,
            order: ShuffleRepeat::new(self.dataset.len(), self.repeats, self.buffer_size, seed),
        }
    }

    /// Start an unshuffled pass over every record, once.
    #[must_use]
    pub fn ordered(&self) -> OrderedBatches<'_> {
        OrderedBatches {
            loader: self,
            next_start: 0,
        }
    }

    fn collate(&self, indices: &[usize]) -> Result<SequenceBatch> {
        let examples = indices
            .iter()
            .map(|&i| {
                self.dataset.get(i).ok_or_else(|| {
                    DataError::InvalidShape(format!(
                        "index {i} out of bounds for {} examples",
                        self.dataset.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        SequenceBatch::collate(&examples)
    }
}

/// Builder for [`SequenceLoader`].
#[derive(Debug, Clone)]
pub struct SequenceLoaderBuilder {
    dataset: SequenceDataset,
    batch_size: usize,
    repeats: usize,
    buffer_size: usize,
}

impl SequenceLoaderBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(dataset: SequenceDataset) -> Self {
        Self {
            dataset,
            batch_size: 32,
            repeats: 1,
            buffer_size: SHUFFLE_BUFFER_SIZE,
        }
    }

    /// Set the minibatch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set how many shuffled passes make up one training epoch.
    #[must_use]
    pub fn repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Set the shuffle buffer capacity.
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Build the loader.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero batch size, zero repeats or an empty dataset.
    pub fn build(self) -> Result<SequenceLoader> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize(
                "Batch size must be greater than 0".to_string(),
            ));
        }
        if self.repeats == 0 {
            return Err(DataError::InvalidBatchSize(
                "An epoch must contain at least one pass over the data".to_string(),
            ));
        }
        if self.dataset.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        Ok(SequenceLoader {
            dataset: self.dataset,
            batch_size: self.batch_size,
            repeats: self.repeats,
            buffer_size: self.buffer_size,
        })
    }
}

/// Minibatches of one training epoch.
pub struct EpochBatches<'a> {
    loader: &'a SequenceLoader,
    order: ShuffleRepeat,
}

impl Iterator for EpochBatches<'_> {
    type Item = Result<SequenceBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices: Vec<usize> = self.order.by_ref().take(self.loader.batch_size).collect();
        if indices.is_empty() {
            return None;
        }
        Some(self.loader.collate(&indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.order.len().div_ceil(self.loader.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EpochBatches<'_> {}

/// Minibatches of one unshuffled pass.
pub struct OrderedBatches<'a> {
    loader: &'a SequenceLoader,
    next_start: usize,
}

impl Iterator for OrderedBatches<'_> {
    type Item = Result<SequenceBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.loader.dataset.len();
        if self.next_start >= n {
            return None;
        }
        let end = (self.next_start + self.loader.batch_size).min(n);
        let indices: Vec<usize> = (self.next_start..end).collect();
        self.next_start = end;
        Some(self.loader.collate(&indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.loader.dataset.len();
        let remaining = n.saturating_sub(self.next_start).div_ceil(self.loader.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for OrderedBatches<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::SequenceExample;
    use frnn_core::Split;
    use ndarray::Array2;

    fn create_test_dataset(lengths: &[usize]) -> SequenceDataset {
        let examples = lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                let input = Array2::from_elem((len, 1), i as f32);
                let output = Array2::from_elem((len, 1), i as f32);
                SequenceExample::new(input, Some(output), None).unwrap()
            })
            .collect();
        SequenceDataset::from_examples(examples, Split::Train, 1, 1).unwrap()
    }

    #[test]
    fn test_loader_builder() {
        let loader = SequenceLoader::builder(create_test_dataset(&[3; 100]))
            .batch_size(32)
            .repeats(2)
            .build()
            .unwrap();

        assert_eq!(loader.batch_size(), 32);
        assert_eq!(loader.epoch_batches(), 7); // ceil(200/32)
        assert_eq!(loader.ordered_batches(), 4); // ceil(100/32)
    }

    #[test]
    fn test_epoch_draws_every_repeat() {
        let loader = SequenceLoader::builder(create_test_dataset(&[2, 3, 4, 5, 6]))
            .batch_size(4)
            .repeats(3)
            .build()
            .unwrap();

        let batches: Vec<SequenceBatch> = loader
            .epoch(Seed::new(0))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(batches.len(), 4);
        let drawn: usize = batches.iter().map(SequenceBatch::len).sum();
        assert_eq!(drawn, 15);
        // Each batch is padded to its own longest example.
        for batch in &batches {
            assert_eq!(batch.padded_length(), *batch.lengths.iter().max().unwrap());
        }
    }

    #[test]
    fn test_epoch_is_restartable_and_seeded() {
        let loader = SequenceLoader::builder(create_test_dataset(&[1, 2, 3, 4, 5, 6, 7, 8]))
            .batch_size(3)
            .build()
            .unwrap();

        let lengths = |seed: u64| -> Vec<Vec<usize>> {
            loader
                .epoch(Seed::new(seed))
                .map(|b| b.unwrap().lengths)
                .collect()
        };
        assert_eq!(lengths(5), lengths(5));
        assert_ne!(lengths(5), lengths(6));
    }

    #[test]
    fn test_ordered_pass_is_stable() {
        let loader = SequenceLoader::builder(create_test_dataset(&[4, 1, 3]))
            .batch_size(2)
            .build()
            .unwrap();

        let batches: Vec<SequenceBatch> = loader.ordered().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].lengths, vec![4, 1]);
        assert_eq!(batches[1].lengths, vec![3]);
        assert_eq!(loader.ordered().len(), 2);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(SequenceLoader::builder(create_test_dataset(&[1]))
            .batch_size(0)
            .build()
            .is_err());
        assert!(SequenceLoader::builder(create_test_dataset(&[1]))
            .repeats(0)
            .build()
            .is_err());
        assert!(matches!(
            SequenceLoader::builder(create_test_dataset(&[])).build(),
            Err(DataError::EmptyDataset)
        ));
    }
}
