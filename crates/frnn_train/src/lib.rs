//! # frnn_train
//!
//! Training, validation and testing of frnn forecasters.
//!
//! This crate provides:
//! - [`MovingWindowTrainer`] driving the epoch loop and the validation pass
//! - [`RegularizedLoss`] combining the L1 error with an L2 penalty
//! - [`OptimizerSettings`] selecting adagrad, adam or [`Cocob`] by name
//! - [`Smape`] and [`denormalize`] for scoring on the original scale
//! - [`TrainerRegistry`] mapping family and window mode to a trainer
//! - [`StopFlag`] for stopping a run between minibatches
//!
//! ## Example
//!
//! ```rust,ignore
//! use frnn_train::{default_registry, evaluate_configuration, OptimizerKind, TrainerOptions};
//!
//! let trainer = default_registry::<TrainBackend>().create_by_name(
//!     "seq2seqwithdenselayer",
//!     "moving_window",
//!     TrainerOptions::new(15, 12, "train.tfrecords").with_validation_file("validation.tfrecords"),
//!     &device,
//! )?;
//! let smape = evaluate_configuration(trainer.as_ref(), &mapping, OptimizerKind::Cocob)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod error;
pub mod losses;
pub mod metrics;
pub mod optimizer;
pub mod stop;
pub mod trainer;

pub use dispatch::{
    default_registry, evaluate_configuration, ForecastTrainer, ModelFamily, TrainerConstructor,
    TrainerRegistry, WindowMode,
};
pub use error::{Result, TrainError};
pub use losses::{ComposedLoss, L1Loss, RegularizedLoss};
pub use metrics::{denormalize, BatchMean, Smape};
pub use optimizer::{Cocob, CocobConfig, CocobState, OptimizerKind, OptimizerSettings, ADAM_EPSILON};
pub use stop::StopFlag;
pub use trainer::{MovingWindowTrainer, TrainerOptions, TrainingReport};
