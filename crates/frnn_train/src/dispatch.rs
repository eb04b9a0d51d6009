//! Trainer construction by architecture family and input window mode.
//!
//! The registry maps closed `(ModelFamily, WindowMode)` pairs to trainer
//! constructors. A pair with no constructor is rejected before any record
//! file is opened.
//!
//! # Example
//!
//! ```rust,ignore
//! use frnn_train::{default_registry, ModelFamily, TrainerOptions, WindowMode};
//!
//! let registry = default_registry::<TrainBackend>();
//! let options = TrainerOptions::new(15, 12, "train.tfrecords")
//!     .with_validation_file("validation.tfrecords");
//! let trainer = registry.create(
//!     ModelFamily::Seq2SeqWithDenseLayer,
//!     WindowMode::MovingWindow,
//!     options,
//!     &device,
//! )?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use burn::tensor::backend::AutodiffBackend;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use frnn_core::{ConfigError, HyperParameters};
use frnn_models::{Seq2SeqDense, Stacking};

use crate::error::Result;
use crate::optimizer::{OptimizerKind, OptimizerSettings};
use crate::trainer::{MovingWindowTrainer, TrainerOptions, TrainingReport};

/// Architecture families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Stacked encoder with a projection at every step.
    Stacking,
    /// Encoder-decoder.
    Seq2Seq,
    /// Encoder with a dense projection of the final state.
    Seq2SeqWithDenseLayer,
    /// Encoder-decoder with Bahdanau attention.
    Attention,
}

impl ModelFamily {
    /// All families, in declaration order.
    pub const ALL: [ModelFamily; 4] = [
        Self::Stacking,
        Self::Seq2Seq,
        Self::Seq2SeqWithDenseLayer,
        Self::Attention,
    ];

    /// Tag used on the command line and in forecast file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stacking => "stacking",
            Self::Seq2Seq => "seq2seq",
            Self::Seq2SeqWithDenseLayer => "seq2seqwithdenselayer",
            Self::Attention => "attention",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.name() == s)
            .ok_or_else(|| ConfigError::UnknownName {
                kind: "model family",
                value: s.to_string(),
            })
    }
}

/// How series are cut into input windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Fixed-size sliding windows, one window per step.
    MovingWindow,
    /// Whole series as a single input.
    NonMovingWindow,
    /// Sliding windows fed one value per decoder step.
    MovingWindowOneInputPerStep,
}

impl WindowMode {
    /// All modes, in declaration order.
    pub const ALL: [WindowMode; 3] = [
        Self::MovingWindow,
        Self::NonMovingWindow,
        Self::MovingWindowOneInputPerStep,
    ];

    /// Tag used on the command line and in forecast file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MovingWindow => "moving_window",
            Self::NonMovingWindow => "non_moving_window",
            Self::MovingWindowOneInputPerStep => "moving_window_one_input_per_step",
        }
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| ConfigError::UnknownName {
                kind: "window mode",
                value: s.to_string(),
            })
    }
}

/// A trainer/tester behind the dispatcher.
pub trait ForecastTrainer {
    /// Family this trainer implements.
    fn family(&self) -> ModelFamily;

    /// Window mode this trainer reads.
    fn window_mode(&self) -> WindowMode;

    /// Options the trainer was built with.
    fn options(&self) -> &TrainerOptions;

    /// Train from fresh parameters and score the validation file.
    fn train_model(
        &self,
        params: &HyperParameters,
        optimizer: &OptimizerSettings,
    ) -> Result<TrainingReport>;

    /// Train from fresh parameters and forecast the test file.
    fn test_model(
        &self,
        params: &HyperParameters,
        optimizer: &OptimizerSettings,
    ) -> Result<Array2<f64>>;
}

/// Type alias for trainer constructor.
pub type TrainerConstructor<B> = Arc<
    dyn Fn(TrainerOptions, &<B as burn::tensor::backend::Backend>::Device) -> Box<dyn ForecastTrainer>
        + Send
        + Sync,
>;

/// Registry of trainer constructors keyed by family and window mode.
pub struct TrainerRegistry<B: AutodiffBackend> {
    trainers: HashMap<(ModelFamily, WindowMode), TrainerConstructor<B>>,
}

impl<B: AutodiffBackend> Default for TrainerRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: AutodiffBackend> TrainerRegistry<B> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            trainers: HashMap::new(),
        }
    }

    /// Register a trainer constructor, replacing any previous one.
    pub fn register<F>(&mut self, family: ModelFamily, mode: WindowMode, constructor: F)
    where
        F: Fn(TrainerOptions, &B::Device) -> Box<dyn ForecastTrainer> + Send + Sync + 'static,
    {
        self.trainers.insert((family, mode), Arc::new(constructor));
    }

    /// Construct the trainer for a pair.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedModel`] for a pair with no
    /// registered constructor.
    pub fn create(
        &self,
        family: ModelFamily,
        mode: WindowMode,
        options: TrainerOptions,
        device: &B::Device,
    ) -> Result<Box<dyn ForecastTrainer>> {
        let constructor =
            self.trainers
                .get(&(family, mode))
                .ok_or_else(|| ConfigError::UnsupportedModel {
                    family: family.to_string(),
                    window_mode: mode.to_string(),
                })?;
        tracing::debug!("Building {family} trainer for {mode} input");
        Ok(constructor(options, device))
    }

    /// Construct a trainer from its textual tags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownName`] for unrecognized tags and
    /// [`ConfigError::UnsupportedModel`] for unmapped pairs.
    pub fn create_by_name(
        &self,
        family: &str,
        mode: &str,
        options: TrainerOptions,
        device: &B::Device,
    ) -> Result<Box<dyn ForecastTrainer>> {
        self.create(family.parse()?, mode.parse()?, options, device)
    }

    /// List all registered pairs.
    pub fn list(&self) -> Vec<(ModelFamily, WindowMode)> {
        let mut pairs: Vec<_> = self.trainers.keys().copied().collect();
        pairs.sort_by_key(|(family, mode)| (family.name(), mode.name()));
        pairs
    }

    /// Check if a pair is registered.
    pub fn contains(&self, family: ModelFamily, mode: WindowMode) -> bool {
        self.trainers.contains_key(&(family, mode))
    }
}

/// Registry with every moving-window trainer built into frnn.
pub fn default_registry<B: AutodiffBackend>() -> TrainerRegistry<B> {
    let mut registry = TrainerRegistry::new();

    registry.register(
        ModelFamily::Seq2SeqWithDenseLayer,
        WindowMode::MovingWindow,
        |options, device: &B::Device| {
            Box::new(MovingWindowTrainer::<B, Seq2SeqDense<B>>::new(
                ModelFamily::Seq2SeqWithDenseLayer,
                options,
                device.clone(),
            ))
        },
    );

    registry.register(
        ModelFamily::Stacking,
        WindowMode::MovingWindow,
        |options, device: &B::Device| {
            Box::new(MovingWindowTrainer::<B, Stacking<B>>::new(
                ModelFamily::Stacking,
                options,
                device.clone(),
            ))
        },
    );

    registry
}

/// Score one hyperparameter configuration.
///
/// Parses `mapping`, pairs the optimizer with the mapping's
/// `learning_rate`, trains and returns the validation SMAPE.
///
/// # Errors
///
/// Returns configuration errors for bad keys or a missing learning rate, and
/// any error raised while training.
pub fn evaluate_configuration(
    trainer: &dyn ForecastTrainer,
    mapping: &HashMap<String, f64>,
    optimizer: OptimizerKind,
) -> Result<f64> {
    let params = HyperParameters::from_mapping(mapping)?;
    let settings = OptimizerSettings::new(optimizer, params.learning_rate)?;
    let report = trainer.train_model(&params, &settings)?;
    Ok(report.smape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainError;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_tags_parse() {
        assert_eq!(
            "seq2seqwithdenselayer".parse::<ModelFamily>().unwrap(),
            ModelFamily::Seq2SeqWithDenseLayer
        );
        assert_eq!(
            "moving_window_one_input_per_step".parse::<WindowMode>().unwrap(),
            WindowMode::MovingWindowOneInputPerStep
        );
        assert!(matches!(
            "transformer".parse::<ModelFamily>(),
            Err(ConfigError::UnknownName { kind: "model family", .. })
        ));
    }

    #[test]
    fn test_default_registry_pairs() {
        let registry = default_registry::<TestBackend>();
        assert!(registry.contains(ModelFamily::Seq2SeqWithDenseLayer, WindowMode::MovingWindow));
        assert!(registry.contains(ModelFamily::Stacking, WindowMode::MovingWindow));
        assert!(!registry.contains(ModelFamily::Attention, WindowMode::NonMovingWindow));
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn test_unmapped_pair_is_rejected_before_io() {
        let registry = default_registry::<TestBackend>();
        let options = TrainerOptions::new(1, 1, "/nonexistent/train.tfrecords");
        let result = registry.create(
            ModelFamily::Seq2Seq,
            WindowMode::NonMovingWindow,
            options,
            &Default::default(),
        );
        assert!(matches!(
            result,
            Err(TrainError::Config(ConfigError::UnsupportedModel { .. }))
        ));
    }

    #[test]
    fn test_create_keeps_family() {
        let registry = default_registry::<TestBackend>();
        let options = TrainerOptions::new(1, 1, "train.tfrecords").with_bias(true);
        let trainer = registry
            .create_by_name("stacking", "moving_window", options, &Default::default())
            .unwrap();
        assert_eq!(trainer.family(), ModelFamily::Stacking);
        assert_eq!(trainer.window_mode(), WindowMode::MovingWindow);
        assert!(trainer.options().use_bias);
    }
}
