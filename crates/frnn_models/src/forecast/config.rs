//! Shared configuration for the forecasting models.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use frnn_core::{CellType, HyperParameters, Seed, DEFAULT_INITIALIZER_STDEV};

use crate::init::TruncatedNormal;
use crate::rnn::EncoderConfig;
use crate::traits::ForecastModel;

/// Everything needed to build a model's parameters.
///
/// # Example
///
/// ```rust,ignore
/// use frnn_models::{ModelConfig, Seq2SeqDense};
///
/// let config = ModelConfig::new(15, 12).with_cell_dimension(32);
/// let model: Seq2SeqDense<NdArray> = config.init(&device);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Features per input step.
    pub input_size: usize,
    /// Forecast horizon.
    pub output_size: usize,
    /// Stacked recurrent layers.
    pub num_hidden_layers: usize,
    /// Hidden units per layer.
    pub cell_dimension: usize,
    /// Recurrent cell kind.
    pub cell_type: CellType,
    /// Bias on the dense projection.
    pub use_bias: bool,
    /// LSTM peephole connections.
    pub use_peepholes: bool,
    /// Standard deviation of the truncated-normal initializer.
    pub initializer_stdev: f64,
    /// Run seed; parameters are drawn from its `"init"` stream.
    pub seed: Seed,
}

impl ModelConfig {
    /// Create a config with one LSTM layer of 32 units.
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            num_hidden_layers: 1,
            cell_dimension: 32,
            cell_type: CellType::LSTM,
            use_bias: false,
            use_peepholes: true,
            initializer_stdev: DEFAULT_INITIALIZER_STDEV,
            seed: Seed::default(),
        }
    }

    /// Take layer count, width and initializer from tuned hyperparameters.
    pub fn from_hyper_parameters(
        params: &HyperParameters,
        input_size: usize,
        output_size: usize,
    ) -> Self {
        Self {
            num_hidden_layers: params.num_hidden_layers,
            cell_dimension: params.lstm_cell_dimension,
            initializer_stdev: params.random_normal_initializer_stdev,
            ..Self::new(input_size, output_size)
        }
    }

    /// Set the number of stacked layers.
    #[must_use]
    pub fn with_num_hidden_layers(mut self, n: usize) -> Self {
        self.num_hidden_layers = n;
        self
    }

    /// Set the hidden width.
    #[must_use]
    pub fn with_cell_dimension(mut self, n: usize) -> Self {
        self.cell_dimension = n;
        self
    }

    /// Set the cell kind.
    #[must_use]
    pub fn with_cell_type(mut self, cell_type: CellType) -> Self {
        self.cell_type = cell_type;
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

    /// Set the initializer standard deviation.
    #[must_use]
    pub fn with_initializer_stdev(mut self, stdev: f64) -> Self {
        self.initializer_stdev = stdev;
        self
    }

    /// Set the run seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Encoder part of the configuration.
    pub fn encoder(&self) -> EncoderConfig {
        EncoderConfig::new(self.input_size, self.cell_dimension)
            .with_num_layers(self.num_hidden_layers)
            .with_cell_type(self.cell_type)
            .with_peepholes(self.use_peepholes)
    }

    /// The seeded initializer every parameter is drawn from, in build order.
    pub fn initializer(&self) -> TruncatedNormal {
        TruncatedNormal::new(self.initializer_stdev, self.seed.derive("init"))
    }

    /// Initialize a model.
    pub fn init<B: Backend, M: ForecastModel<B>>(&self, device: &B::Device) -> M {
        tracing::debug!(
            "Initializing {} layer(s) of {} {} units",
            self.num_hidden_layers,
            self.cell_dimension,
            self.cell_type
        );
        M::init(self, device)
    }
}
