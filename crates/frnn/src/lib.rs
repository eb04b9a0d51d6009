//! # frnn
//!
//! Recurrent forecasting models for time series, trained and scored on Burn.
//!
//! frnn trains a recurrent encoder with a dense projection on moving-window
//! records and reports the validation SMAPE of the forecasts after undoing the
//! log-space level/seasonality normalization:
//!
//! - **Data**: record files, padded minibatches, epoch-seeded shuffling
//! - **Models**: LSTM (with peepholes), GRU and simple RNN encoders
//! - **Training**: L1 + L2 objective, adagrad/adam/COCOB, SMAPE scoring
//! - **Dispatch**: trainers selected by architecture family and window mode
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use frnn::prelude::*;
//!
//! let options = TrainerOptions::new(15, 12, "train.tfrecords")
//!     .with_validation_file("validation.tfrecords");
//! let trainer = default_registry::<TrainBackend>().create(
//!     ModelFamily::Seq2SeqWithDenseLayer,
//!     WindowMode::MovingWindow,
//!     options,
//!     &Default::default(),
//! )?;
//!
//! let smape = evaluate_configuration(trainer.as_ref(), &mapping, OptimizerKind::Cocob)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export all crates
pub use frnn_core as core;
pub use frnn_data as data;
pub use frnn_models as models;
pub use frnn_train as train;

/// Default training backend: autodiff over the ndarray CPU backend.
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use frnn::prelude::*;
/// ```
pub mod prelude {
    pub use super::TrainBackend;

    // Core types
    pub use frnn_core::{CellType, ConfigError, HyperParameters, Seed, Split};

    // Data
    pub use frnn_data::{
        write_records, EncodedRecord, RecordReader, RecordWriter, SequenceBatch, SequenceDataset,
        SequenceLoader,
    };

    // Models
    pub use frnn_models::{ForecastModel, ModelConfig, Seq2SeqDense, Stacking};

    // Training
    pub use frnn_train::{
        default_registry, evaluate_configuration, ForecastTrainer, ModelFamily,
        MovingWindowTrainer, OptimizerKind, OptimizerSettings, StopFlag, TrainError,
        TrainerOptions, TrainerRegistry, TrainingReport, WindowMode,
    };
}
