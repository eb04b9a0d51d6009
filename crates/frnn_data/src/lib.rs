//! # frnn_data
//!
//! Record files and minibatch pipelines for frnn forecasting models.
//!
//! This crate provides:
//! - [`RecordReader`] / [`RecordWriter`] for the compressed, checksummed record format
//! - [`SequenceExample`] and [`SequenceDataset`] for validated variable-length series
//! - [`SequenceBatch`] for minibatches padded to their own longest sequence
//! - [`SequenceLoader`] for shuffled training epochs and ordered evaluation passes
//!
//! ## Example
//!
//! ```rust,ignore
//! use frnn_core::{Seed, Split};
//! use frnn_data::{SequenceDataset, SequenceLoader};
//!
//! let train = SequenceDataset::load("train.tfrecords", Split::Train, 15, 12)?;
//! let loader = SequenceLoader::builder(train)
//!     .batch_size(10)
//!     .repeats(5)
//!     .build()?;
//!
//! for batch in loader.epoch(Seed::new(1).for_epoch(0)) {
//!     let batch = batch?;
//!     println!("{:?}", batch.inputs.dim());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod batch;
mod dataset;
mod error;
mod example;
mod loader;
mod record;
mod shuffle;

pub use batch::{final_step, SequenceBatch};
pub use dataset::SequenceDataset;
pub use error::{DataError, Result};
pub use example::SequenceExample;
pub use loader::{EpochBatches, OrderedBatches, SequenceLoader, SequenceLoaderBuilder};
pub use record::{write_records, EncodedRecord, RecordReader, RecordWriter};
pub use shuffle::{ShuffleRepeat, SHUFFLE_BUFFER_SIZE};
