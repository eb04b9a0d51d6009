//! # frnn_models
//!
//! Recurrent forecasting models for frnn, built on Burn.
//!
//! ## Building blocks
//! - [`LstmCell`] (optional peepholes), [`GruCell`], [`SimpleRnnCell`]
//! - [`Encoder`] - stacked recurrent layers of one cell kind
//! - [`dense_head`] - `burn::nn::Linear` projection to the forecast horizon
//! - [`final_step`] - gather of the last valid step per sequence
//! - [`GaussianNoise`] - seeded input perturbation for the training path
//!
//! ## Model families
//! - [`Seq2SeqDense`] - dense projection of the final encoder state
//! - [`Stacking`] - dense projection at every step
//!
//! Every model implements [`ForecastModel`]. Parameters are drawn from a
//! [`TruncatedNormal`] stream derived from the run seed, so two models built
//! from the same [`ModelConfig`] are identical.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod convert;
mod error;
pub mod forecast;
mod gather;
mod head;
mod init;
mod noise;
mod penalty;
pub mod rnn;
mod traits;

pub use convert::{array2_from_tensor, scalar, tensor_from_array3};
pub use error::{ModelError, Result};
pub use forecast::{ModelConfig, Seq2SeqDense, Stacking};
pub use gather::{final_step, valid_steps};
pub use head::{dense_head, dense_l2_penalty};
pub use init::{constant_vector, TruncatedNormal};
pub use noise::GaussianNoise;
pub use penalty::l2_loss;
pub use rnn::{Encoder, EncoderConfig, GruCell, LstmCell, SimpleRnnCell};
pub use traits::{ForecastModel, TrainingPairs};
