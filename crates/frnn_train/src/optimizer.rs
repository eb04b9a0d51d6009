//! Optimizer selection by name.
//!
//! Provides the three optimizers a run can be configured with:
//! - `adagrad` and `adam` from Burn, driven by an explicit learning rate
//! - [`Cocob`] - learning-rate-free coin betting, implemented here

use std::fmt;
use std::str::FromStr;

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{AdaGradConfig, AdamConfig, SimpleOptimizer};
use burn::prelude::*;
use burn::record::Record;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use frnn_core::ConfigError;

/// Epsilon used by the Adam optimizer.
pub const ADAM_EPSILON: f32 = 1e-8;

/// Gradient-based optimizers a run can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Adagrad.
    Adagrad,
    /// Adam.
    Adam,
    /// Continuous coin betting; ignores the learning rate.
    Cocob,
}

impl OptimizerKind {
    /// Name used in configuration files and forecast file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Adagrad => "adagrad",
            Self::Adam => "adam",
            Self::Cocob => "cocob",
        }
    }

    /// Whether the optimizer reads a learning rate.
    pub fn uses_learning_rate(&self) -> bool {
        !matches!(self, Self::Cocob)
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptimizerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adagrad" => Ok(Self::Adagrad),
            "adam" => Ok(Self::Adam),
            "cocob" => Ok(Self::Cocob),
            _ => Err(ConfigError::UnknownOptimizer(s.to_string())),
        }
    }
}

/// An optimizer choice together with its learning rate.
///
/// # Example
///
/// ```rust
/// use frnn_train::{OptimizerKind, OptimizerSettings};
///
/// let settings = OptimizerSettings::from_name("adam", Some(1e-3)).unwrap();
/// assert_eq!(settings.kind(), OptimizerKind::Adam);
/// assert!(OptimizerSettings::from_name("sgd", Some(0.1)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    kind: OptimizerKind,
    learning_rate: f64,
}

impl OptimizerSettings {
    /// Settings for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] when adagrad or adam has no
    /// learning rate and [`ConfigError::InvalidValue`] for a non-positive one.
    pub fn new(kind: OptimizerKind, learning_rate: Option<f64>) -> Result<Self, ConfigError> {
        let learning_rate = match (kind.uses_learning_rate(), learning_rate) {
            (true, None) => return Err(ConfigError::MissingKey("learning_rate".to_string())),
            (true, Some(lr)) if !(lr.is_finite() && lr > 0.0) => {
                return Err(ConfigError::InvalidValue {
                    key: "learning_rate".to_string(),
                    reason: format!("must be positive, got {lr}"),
                })
            }
            (true, Some(lr)) => lr,
            (false, Some(lr)) => {
                tracing::warn!("Learning rate {lr} is ignored by the {kind} optimizer");
                0.0
            }
            (false, None) => 0.0,
        };
        Ok(Self {
            kind,
            learning_rate,
        })
    }

    /// Look up an optimizer by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOptimizer`] for names outside
    /// {adagrad, adam, cocob}, plus the errors of [`OptimizerSettings::new`].
    pub fn from_name(name: &str, learning_rate: Option<f64>) -> Result<Self, ConfigError> {
        Self::new(name.parse()?, learning_rate)
    }

    /// Selected optimizer.
    pub fn kind(&self) -> OptimizerKind {
        self.kind
    }

    /// Learning rate handed to each step; zero for cocob.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Adagrad configuration.
    pub fn adagrad(&self) -> AdaGradConfig {
        AdaGradConfig::new()
    }

    /// Adam configuration.
    pub fn adam(&self) -> AdamConfig {
        AdamConfig::new().with_epsilon(ADAM_EPSILON)
    }

    /// COCOB configuration.
    pub fn cocob(&self) -> CocobConfig {
        CocobConfig::default()
    }
}

/// COCOB configuration.
///
/// Reference: "Training Deep Networks without Learning Rates Through Coin
/// Betting" by Orabona & Tommasi (2017)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CocobConfig {
    /// Bound on the betting fraction early in training.
    pub alpha: f32,
    /// Starting value of the per-weight gradient range estimate.
    pub initial_lr: f32,
}

impl Default for CocobConfig {
    fn default() -> Self {
        Self {
            alpha: 100.0,
            initial_lr: 1e-8,
        }
    }
}

impl CocobConfig {
    /// Create a configuration with the given alpha.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            ..Default::default()
        }
    }

    /// Set the initial gradient range estimate.
    #[must_use]
    pub fn with_initial_lr(mut self, initial_lr: f32) -> Self {
        self.initial_lr = initial_lr;
        self
    }

    /// Initialize the optimizer for a module.
    pub fn init<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> OptimizerAdaptor<Cocob, M, B> {
        OptimizerAdaptor::from(Cocob {
            alpha: self.alpha,
            initial_lr: self.initial_lr,
        })
    }
}

/// Per-parameter COCOB accumulators.
#[derive(Record, Clone)]
pub struct CocobState<B: Backend, const D: usize> {
    /// Sum of gradients.
    pub gradients_sum: Tensor<B, D>,
    /// Sum of absolute gradients.
    pub grad_norm_sum: Tensor<B, D>,
    /// Current offset from the initial weights.
    pub tilde_w: Tensor<B, D>,
    /// Largest absolute gradient seen.
    pub lr: Tensor<B, D>,
    /// Accumulated reward, never negative.
    pub reward: Tensor<B, D>,
}

/// COCOB-Backprop optimizer.
#[derive(Debug, Clone, Copy)]
pub struct Cocob {
    alpha: f32,
    initial_lr: f32,
}

impl<B: Backend> SimpleOptimizer<B> for Cocob {
    type State<const D: usize> = CocobState<B, D>;

    fn step<const D: usize>(
        &self,
        _lr: burn::LearningRate,
        tensor: Tensor<B, D>,
        grad: Tensor<B, D>,
        state: Option<Self::State<D>>,
    ) -> (Tensor<B, D>, Option<Self::State<D>>) {
        let state = state.unwrap_or_else(|| CocobState {
            gradients_sum: tensor.zeros_like(),
            grad_norm_sum: tensor.zeros_like(),
            tilde_w: tensor.zeros_like(),
            lr: tensor.full_like(self.initial_lr),
            reward: tensor.zeros_like(),
        });

        let gradients_sum = state.gradients_sum + grad.clone();
        let grad_norm_sum = state.grad_norm_sum + grad.clone().abs();
        let lr = state.lr.max_pair(grad.clone().abs());
        let reward = (state.reward - grad * state.tilde_w.clone()).clamp_min(0.0);

        let denominator = lr.clone()
            * (grad_norm_sum.clone() + lr.clone()).max_pair(lr.clone().mul_scalar(self.alpha));
        let new_w = gradients_sum.clone().neg() / denominator * (reward.clone() + lr.clone());

        let tensor = tensor - state.tilde_w + new_w.clone();

        let state = CocobState {
            gradients_sum,
            grad_norm_sum,
            tilde_w: new_w,
            lr,
            reward,
        };
        (tensor, Some(state))
    }

    fn to_device<const D: usize>(state: Self::State<D>, device: &B::Device) -> Self::State<D> {
        CocobState {
            gradients_sum: state.gradients_sum.to_device(device),
            grad_norm_sum: state.grad_norm_sum.to_device(device),
            tilde_w: state.tilde_w.to_device(device),
            lr: state.lr.to_device(device),
            reward: state.reward.to_device(device),
        }
    }
}
