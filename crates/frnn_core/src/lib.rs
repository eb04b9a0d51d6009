//! # frnn_core
//!
//! Core types shared by every frnn crate.
//!
//! This crate provides:
//! - [`Seed`] for deterministic random number generation
//! - [`Split`] to tell training, validation and test records apart
//! - [`HyperParameters`] parsed from the externally supplied configuration mapping
//! - [`CellType`] for selecting the recurrent cell of the encoder
//! - Error types, including [`ConfigError`] for fatal configuration problems
//!
//! ## Shape Convention
//!
//! Sequence data follows the convention `(B, T, F)`:
//! - `B`: Batch size (number of series windows)
//! - `T`: Padded sequence length (time steps)
//! - `F`: Features per step (`input_size` or `output_size`)
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use frnn_core::{HyperParameters, Seed};
//!
//! let mut mapping = HashMap::new();
//! mapping.insert("num_hidden_layers".to_string(), 1.0);
//! mapping.insert("max_num_epochs".to_string(), 3.0);
//! mapping.insert("max_epoch_size".to_string(), 1.0);
//! mapping.insert("lstm_cell_dimension".to_string(), 20.4);
//! mapping.insert("l2_regularization".to_string(), 0.0001);
//! mapping.insert("minibatch_size".to_string(), 10.0);
//! mapping.insert("gaussian_noise_stdev".to_string(), 0.0004);
//!
//! let params = HyperParameters::from_mapping(&mapping).unwrap();
//! assert_eq!(params.lstm_cell_dimension, 20);
//!
//! let seed = Seed::new(1);
//! let _shuffle_seed = seed.derive("epoch-0");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod seed;
mod split;

pub use config::{CellType, HyperParameters, DEFAULT_INITIALIZER_STDEV};
pub use error::{ConfigError, Result};
pub use seed::Seed;
pub use split::Split;
