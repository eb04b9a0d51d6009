//! Hyperparameter configuration consumed by every training run.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Standard deviation of the truncated-normal weight initializer when the
/// configuration does not name one.
pub const DEFAULT_INITIALIZER_STDEV: f64 = 1e-4;

const NUM_HIDDEN_LAYERS: &str = "num_hidden_layers";
const MAX_NUM_EPOCHS: &str = "max_num_epochs";
const MAX_EPOCH_SIZE: &str = "max_epoch_size";
const LSTM_CELL_DIMENSION: &str = "lstm_cell_dimension";
const L2_REGULARIZATION: &str = "l2_regularization";
const MINIBATCH_SIZE: &str = "minibatch_size";
const GAUSSIAN_NOISE_STDEV: &str = "gaussian_noise_stdev";
const LEARNING_RATE: &str = "learning_rate";
const RANDOM_NORMAL_INITIALIZER_STDEV: &str = "random_normal_initializer_stdev";

/// Recurrent cell used by every layer of the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CellType {
    /// Long Short-Term Memory, optionally with peephole connections.
    #[default]
    LSTM,
    /// Gated Recurrent Unit.
    GRU,
    /// Plain (Elman) recurrent cell with a tanh activation.
    RNN,
}

impl FromStr for CellType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LSTM" => Ok(Self::LSTM),
            "GRU" => Ok(Self::GRU),
            "RNN" => Ok(Self::RNN),
            _ => Err(ConfigError::UnknownName {
                kind: "cell type",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LSTM => "LSTM",
            Self::GRU => "GRU",
            Self::RNN => "RNN",
        };
        f.write_str(name)
    }
}

/// Hyperparameters of one training run.
///
/// Built from the mapping a hyperparameter search hands over. Integer-valued
/// entries arrive as floats and are rounded to the nearest integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParameters {
    /// Number of stacked recurrent layers in the encoder.
    pub num_hidden_layers: usize,
    /// Number of training epochs.
    pub max_num_epochs: usize,
    /// Shuffle-repeats of the training records per epoch.
    pub max_epoch_size: usize,
    /// Width of every recurrent cell.
    pub lstm_cell_dimension: usize,
    /// Scale of the L2 penalty over all trainable parameters.
    pub l2_regularization: f64,
    /// Examples per minibatch.
    pub minibatch_size: usize,
    /// Standard deviation of the Gaussian noise added to training inputs.
    pub gaussian_noise_stdev: f64,
    /// Learning rate for the adagrad and adam optimizers.
    #[serde(default)]
    pub learning_rate: Option<f64>,
    /// Standard deviation of the truncated-normal weight initializer.
    #[serde(default = "default_initializer_stdev")]
    pub random_normal_initializer_stdev: f64,
}

fn default_initializer_stdev() -> f64 {
    DEFAULT_INITIALIZER_STDEV
}

impl HyperParameters {
    /// Parse a configuration mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] when a required key is absent and
    /// [`ConfigError::InvalidValue`] when a value is not finite or out of range.
    pub fn from_mapping(mapping: &HashMap<String, f64>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            mapping
                .get(key)
                .copied()
                .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
        };

        let params = Self {
            num_hidden_layers: rounded(NUM_HIDDEN_LAYERS, required(NUM_HIDDEN_LAYERS)?)?,
            max_num_epochs: rounded(MAX_NUM_EPOCHS, required(MAX_NUM_EPOCHS)?)?,
            max_epoch_size: rounded(MAX_EPOCH_SIZE, required(MAX_EPOCH_SIZE)?)?,
            lstm_cell_dimension: rounded(LSTM_CELL_DIMENSION, required(LSTM_CELL_DIMENSION)?)?,
            l2_regularization: required(L2_REGULARIZATION)?,
            minibatch_size: rounded(MINIBATCH_SIZE, required(MINIBATCH_SIZE)?)?,
            gaussian_noise_stdev: required(GAUSSIAN_NOISE_STDEV)?,
            learning_rate: mapping.get(LEARNING_RATE).copied(),
            random_normal_initializer_stdev: mapping
                .get(RANDOM_NORMAL_INITIALIZER_STDEV)
                .copied()
                .unwrap_or(DEFAULT_INITIALIZER_STDEV),
        };
        params.validate()?;
        Ok(params)
    }

    /// Check value ranges.
    ///
    /// Called by [`HyperParameters::from_mapping`]; call it directly for
    /// values deserialized from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive(NUM_HIDDEN_LAYERS, self.num_hidden_layers)?;
        positive(MAX_EPOCH_SIZE, self.max_epoch_size)?;
        positive(LSTM_CELL_DIMENSION, self.lstm_cell_dimension)?;
        positive(MINIBATCH_SIZE, self.minibatch_size)?;
        non_negative(L2_REGULARIZATION, self.l2_regularization)?;
        non_negative(GAUSSIAN_NOISE_STDEV, self.gaussian_noise_stdev)?;
        if !(self.random_normal_initializer_stdev.is_finite()
            && self.random_normal_initializer_stdev > 0.0)
        {
            return Err(invalid(RANDOM_NORMAL_INITIALIZER_STDEV, "must be a positive number"));
        }
        if let Some(lr) = self.learning_rate {
            if !(lr.is_finite() && lr > 0.0) {
                return Err(invalid(LEARNING_RATE, "must be a positive number"));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn rounded(key: &str, value: f64) -> Result<usize, ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(key, "must be a finite, non-negative number"));
    }
    Ok(value.round() as usize)
}

fn positive(key: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(key, "must be at least 1"));
    }
    Ok(())
}

fn non_negative(key: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(key, "must be a finite, non-negative number"));
    }
    Ok(())
}
