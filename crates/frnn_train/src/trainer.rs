//! Training, validation and testing for moving-window forecasters.
//!
//! A run initializes fresh parameters from the run seed, optimizes them for
//! `max_num_epochs` epochs over noise-perturbed inputs, then evaluates the
//! clean inference path of the same weights on the validation or test file.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use frnn_core::{CellType, HyperParameters, Seed, Split};
use frnn_data::{SequenceDataset, SequenceLoader};
use frnn_models::{
    array2_from_tensor, tensor_from_array3, ForecastModel, GaussianNoise, ModelConfig,
};

use crate::dispatch::{ForecastTrainer, ModelFamily, WindowMode};
use crate::error::{Result, TrainError};
use crate::losses::RegularizedLoss;
use crate::metrics::{denormalize, BatchMean, Smape};
use crate::optimizer::{OptimizerKind, OptimizerSettings};
use crate::stop::StopFlag;

/// The keyword set every trainer is constructed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerOptions {
    /// Bias on the dense projection.
    #[serde(default)]
    pub use_bias: bool,
    /// LSTM peephole connections.
    #[serde(default = "default_true")]
    pub use_peepholes: bool,
    /// Features per input step.
    pub input_size: usize,
    /// Forecast horizon.
    pub output_size: usize,
    /// Training record file.
    pub train_file: PathBuf,
    /// Validation record file, needed by `train_model`.
    #[serde(default)]
    pub validation_file: Option<PathBuf>,
    /// Test record file, needed by `test_model`.
    #[serde(default)]
    pub test_file: Option<PathBuf>,
    /// Series were shifted by one before taking logs.
    #[serde(default)]
    pub contain_zero_values: bool,
    /// Run seed.
    #[serde(default)]
    pub seed: Seed,
    /// Recurrent cell kind.
    #[serde(default)]
    pub cell_type: CellType,
}

fn default_true() -> bool {
    true
}

impl TrainerOptions {
    /// Create options with peepholes on, no bias, seed 1 and LSTM cells.
    pub fn new(input_size: usize, output_size: usize, train_file: impl Into<PathBuf>) -> Self {
        Self {
            use_bias: false,
            use_peepholes: true,
            input_size,
            output_size,
            train_file: train_file.into(),
            validation_file: None,
            test_file: None,
            contain_zero_values: false,
            seed: Seed::default(),
            cell_type: CellType::default(),
        }
    }

    /// Set the validation file.
    #[must_use]
    pub fn with_validation_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.validation_file = Some(path.into());
        self
    }

    /// Set the test file.
    #[must_use]
    pub fn with_test_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.test_file = Some(path.into());
        self
    }

    /// Enable or disable the projection bias.
    #[must_use]
    pub fn with_bias(mut self, use_bias: bool) -> Self {
        self.use_bias = use_bias;
        self
    }

    /// Enable or disable LSTM peepholes.
    #[must_use]
    pub fn with_peepholes(mut self, use_peepholes: bool) -> Self {
        self.use_peepholes = use_peepholes;
        self
    }

    /// Mark the data as zero-adjusted.
    #[must_use]
    pub fn with_zero_values(mut self, contain_zero_values: bool) -> Self {
        self.contain_zero_values = contain_zero_values;
        self
    }

    /// Set the run seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Set the cell kind.
    #[must_use]
    pub fn with_cell_type(mut self, cell_type: CellType) -> Self {
        self.cell_type = cell_type;
        self
    }

    /// Model configuration for one set of hyperparameters.
    pub fn model_config(&self, params: &HyperParameters) -> ModelConfig {
        ModelConfig::from_hyper_parameters(params, self.input_size, self.output_size)
            .with_cell_type(self.cell_type)
            .with_bias(self.use_bias)
            .with_peepholes(self.use_peepholes)
            .with_seed(self.seed)
    }
}

/// Outcome of one `train_model` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Mean of the per-batch validation SMAPE values.
    pub smape: f64,
    /// SMAPE of every validation batch, in file order.
    pub batch_smapes: Vec<f64>,
    /// Completed training epochs.
    pub epochs: usize,
    /// Optimizer steps taken.
    pub steps: usize,
    /// Objective of the last optimizer step.
    pub final_loss: Option<f64>,
    /// Wall-clock time of the run in seconds.
    pub training_time_secs: f64,
}

/// Trainer for moving-window records, generic over the model family.
///
/// # Example
///
/// ```rust,ignore
/// use frnn_train::{MovingWindowTrainer, OptimizerSettings, TrainerOptions};
/// use frnn_models::Seq2SeqDense;
///
/// let options = TrainerOptions::new(15, 12, "train.tfrecords")
///     .with_validation_file("validation.tfrecords");
/// let trainer = MovingWindowTrainer::<TrainBackend, Seq2SeqDense<TrainBackend>>::new(
///     ModelFamily::Seq2SeqWithDenseLayer,
///     options,
///     device,
/// );
/// let report = trainer.train_model(&params, &OptimizerSettings::from_name("cocob", None)?)?;
/// println!("SMAPE {:.4}", report.smape);
/// ```
pub struct MovingWindowTrainer<B: AutodiffBackend, M> {
    family: ModelFamily,
    options: TrainerOptions,
    device: B::Device,
    stop: StopFlag,
    _model: PhantomData<M>,
}

impl<B, M> MovingWindowTrainer<B, M>
where
    B: AutodiffBackend,
    M: ForecastModel<B> + AutodiffModule<B>,
    M::InnerModule: ForecastModel<B::InnerBackend>,
{
    /// Create a trainer.
    pub fn new(family: ModelFamily, options: TrainerOptions, device: B::Device) -> Self {
        Self {
            family,
            options,
            device,
            stop: StopFlag::new(),
            _model: PhantomData,
        }
    }

    /// Share a stop flag with the caller.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// A handle to this trainer's stop flag.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Trainer options.
    pub fn options(&self) -> &TrainerOptions {
        &self.options
    }

    /// Train on the training file and return the validation SMAPE.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid hyperparameters or a missing
    /// validation file, a data error for malformed records, and
    /// [`TrainError::Interrupted`] when the stop flag is raised.
    pub fn train_model(
        &self,
        params: &HyperParameters,
        optimizer: &OptimizerSettings,
    ) -> Result<TrainingReport> {
        params.validate()?;
        let start_time = Instant::now();

        let validation_file = required_file(&self.options.validation_file, "validation_file")?;
        let train = self.load(&self.options.train_file, Split::Train)?;
        let validation = self.load(validation_file, Split::Valid)?;

        let fitted = self.fit(params, optimizer, train)?;

        let loader = SequenceLoader::builder(validation)
            .batch_size(params.minibatch_size)
            .build()?;
        let smapes = self.validate(&fitted.model.valid(), &loader)?;
        let smape = smapes
            .mean()
            .ok_or(TrainError::NothingToEvaluate("validation"))?;

        tracing::info!(
            "SMAPE value: {smape:.6} over {} validation batch(es)",
            smapes.len()
        );

        Ok(TrainingReport {
            smape,
            batch_smapes: smapes.values().to_vec(),
            epochs: fitted.epochs,
            steps: fitted.steps,
            final_loss: fitted.final_loss,
            training_time_secs: start_time.elapsed().as_secs_f64(),
        })
    }

    /// Train on the training file and forecast every test record.
    ///
    /// Returns one denormalized row of `output_size` values per test record,
    /// in file order.
    ///
    /// # Errors
    ///
    /// Same as [`MovingWindowTrainer::train_model`], with the test file in
    /// place of the validation file.
    pub fn test_model(
        &self,
        params: &HyperParameters,
        optimizer: &OptimizerSettings,
    ) -> Result<Array2<f64>> {
        params.validate()?;

        let test_file = required_file(&self.options.test_file, "test_file")?;
        let train = self.load(&self.options.train_file, Split::Train)?;
        let test = self.load(test_file, Split::Test)?;

        let fitted = self.fit(params, optimizer, train)?;

        let loader = SequenceLoader::builder(test)
            .batch_size(params.minibatch_size)
            .build()?;
        let forecasts = self.forecast(&fitted.model.valid(), &loader)?;

        tracing::info!("Forecast {} test series", forecasts.nrows());
        Ok(forecasts)
    }

    fn load(&self, path: &Path, split: Split) -> Result<SequenceDataset> {
        Ok(SequenceDataset::load(
            path,
            split,
            self.options.input_size,
            self.options.output_size,
        )?)
    }

    /// Build fresh parameters and optimize them with the selected optimizer.
    fn fit(
        &self,
        params: &HyperParameters,
        optimizer: &OptimizerSettings,
        train: SequenceDataset,
    ) -> Result<Fitted<M>> {
        let model: M = self.options.model_config(params).init(&self.device);
        let loader = SequenceLoader::builder(train)
            .batch_size(params.minibatch_size)
            .repeats(params.max_epoch_size)
            .build()?;

        let lr = optimizer.learning_rate();
        match optimizer.kind() {
            OptimizerKind::Adagrad => {
                self.fit_with(model, optimizer.adagrad().init::<B, M>(), lr, &loader, params)
            }
            OptimizerKind::Adam => {
                self.fit_with(model, optimizer.adam().init::<B, M>(), lr, &loader, params)
            }
            OptimizerKind::Cocob => {
                self.fit_with(model, optimizer.cocob().init::<B, M>(), lr, &loader, params)
            }
        }
    }

    fn fit_with<O: Optimizer<M, B>>(
        &self,
        mut model: M,
        mut optim: O,
        lr: f64,
        loader: &SequenceLoader,
        params: &HyperParameters,
    ) -> Result<Fitted<M>> {
        let seed = self.options.seed;
        let loss_fn = RegularizedLoss::new(params.l2_regularization);
        let mut noise = GaussianNoise::new(params.gaussian_noise_stdev, seed.derive("noise"));

        let mut steps = 0;
        let mut final_loss = None;

        for epoch in 0..params.max_num_epochs {
            tracing::info!("Epoch {}/{}", epoch + 1, params.max_num_epochs);

            let mut epoch_loss = 0.0;
            let mut n_batches = 0;

            for batch_result in loader.epoch(seed.for_epoch(epoch)) {
                if self.stop.is_stopped() {
                    return Err(TrainError::Interrupted(format!(
                        "stopped in epoch {} after {steps} step(s)",
                        epoch + 1
                    )));
                }
                let batch = batch_result?;
                let targets = batch.targets.as_ref().ok_or_else(|| {
                    TrainError::ForwardError("training batch has no targets".to_string())
                })?;

                let inputs = tensor_from_array3::<B>(&noise.perturb(&batch.inputs), &self.device);
                let targets = tensor_from_array3::<B>(targets, &self.device);

                let pairs = model.training_pairs(inputs, targets, &batch.lengths);
                let loss = loss_fn.forward(&model, pairs);
                tracing::debug!(
                    "step {steps}: error={:.6} penalty={:.6} total={:.6}",
                    loss.error,
                    loss.penalty,
                    loss.total
                );

                let grads = loss.objective.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(lr, model, grads);

                epoch_loss += loss.total;
                n_batches += 1;
                steps += 1;
                final_loss = Some(loss.total);
            }

            if n_batches > 0 {
                tracing::info!(
                    "Epoch {}: mean loss {:.6} over {n_batches} batch(es)",
                    epoch + 1,
                    epoch_loss / n_batches as f64
                );
            }
        }

        Ok(Fitted {
            model,
            epochs: params.max_num_epochs,
            steps,
            final_loss,
        })
    }

    /// SMAPE of every validation batch through the inference path.
    fn validate(&self, model: &M::InnerModule, loader: &SequenceLoader) -> Result<BatchMean> {
        let mut smapes = BatchMean::new();

        for batch_result in loader.ordered() {
            let batch = batch_result?;
            let (targets, metadata) = match (&batch.targets, &batch.metadata) {
                (Some(t), Some(m)) => (t, m),
                _ => {
                    return Err(TrainError::ForwardError(
                        "validation batch needs targets and metadata".to_string(),
                    ))
                }
            };

            let inputs = tensor_from_array3::<B::InnerBackend>(&batch.inputs, &self.device);
            let predictions = array2_from_tensor(model.forecast(inputs, &batch.lengths))?;

            let actuals = batch.final_step(targets);
            let metadata = batch.final_step(metadata);
            let zero_adjusted = self.options.contain_zero_values;

            let predictions = denormalize(predictions.view(), metadata.view(), zero_adjusted);
            let actuals = denormalize(actuals.view(), metadata.view(), zero_adjusted);

            let smape = Smape.compute(predictions.view(), actuals.view());
            tracing::debug!("validation batch {}: smape={smape:.6}", smapes.len());
            smapes.push(smape);
        }

        Ok(smapes)
    }

    /// Denormalized forecasts of every record through the inference path.
    fn forecast(&self, model: &M::InnerModule, loader: &SequenceLoader) -> Result<Array2<f64>> {
        let mut forecasts = Array2::<f64>::zeros((0, self.options.output_size));

        for batch_result in loader.ordered() {
            let batch = batch_result?;
            let metadata = batch.metadata.as_ref().ok_or_else(|| {
                TrainError::ForwardError("test batch has no metadata".to_string())
            })?;

            let inputs = tensor_from_array3::<B::InnerBackend>(&batch.inputs, &self.device);
            let predictions = array2_from_tensor(model.forecast(inputs, &batch.lengths))?;
            let metadata = batch.final_step(metadata);

            let rows = denormalize(
                predictions.view(),
                metadata.view(),
                self.options.contain_zero_values,
            );
            forecasts
                .append(Axis(0), rows.view())
                .map_err(|e| TrainError::ForwardError(e.to_string()))?;
        }

        if forecasts.nrows() == 0 {
            return Err(TrainError::NothingToEvaluate("test"));
        }
        Ok(forecasts)
    }
}

impl<B, M> ForecastTrainer for MovingWindowTrainer<B, M>
where
    B: AutodiffBackend,
    M: ForecastModel<B> + AutodiffModule<B>,
    M::InnerModule: ForecastModel<B::InnerBackend>,
{
    fn family(&self) -> ModelFamily {
        self.family
    }

    fn window_mode(&self) -> WindowMode {
        WindowMode::MovingWindow
    }

    fn options(&self) -> &TrainerOptions {
        &self.options
    }

    fn train_model(
        &self,
        params: &HyperParameters,
        optimizer: &OptimizerSettings,
    ) -> Result<TrainingReport> {
        MovingWindowTrainer::train_model(self, params, optimizer)
    }

    fn test_model(
        &self,
        params: &HyperParameters,
        optimizer: &OptimizerSettings,
    ) -> Result<Array2<f64>> {
        MovingWindowTrainer::test_model(self, params, optimizer)
    }
}

struct Fitted<M> {
    model: M,
    epochs: usize,
    steps: usize,
    final_loss: Option<f64>,
}

fn required_file<'a>(path: &'a Option<PathBuf>, key: &str) -> Result<&'a Path> {
    path.as_deref().ok_or_else(|| {
        TrainError::Config(frnn_core::ConfigError::MissingKey(key.to_string()))
    })
}
