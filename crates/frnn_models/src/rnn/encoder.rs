//! Stacked recurrent encoder.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use frnn_core::CellType;

use super::gru::GruCell;
use super::lstm::LstmCell;
use super::simple::SimpleRnnCell;
use crate::init::TruncatedNormal;

/// Configuration for [`Encoder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Features per input step.
    pub input_size: usize,
    /// Hidden units per layer.
    pub hidden_size: usize,
    /// Number of stacked layers.
    pub num_layers: usize,
    /// Recurrent cell kind.
    pub cell_type: CellType,
    /// Peephole connections, LSTM only.
    pub use_peepholes: bool,
}

impl EncoderConfig {
    /// Create a single-layer LSTM configuration.
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            num_layers: 1,
            cell_type: CellType::LSTM,
            use_peepholes: true,
        }
    }

    /// Set the number of layers.
    #[must_use]
    pub fn with_num_layers(mut self, num_layers: usize) -> Self {
        self.num_layers = num_layers;
        self
    }

    /// Set the cell kind.
    #[must_use]
    pub fn with_cell_type(mut self, cell_type: CellType) -> Self {
        self.cell_type = cell_type;
        self
    }

    /// Enable or disable LSTM peepholes.
    #[must_use]
    pub fn with_peepholes(mut self, use_peepholes: bool) -> Self {
        self.use_peepholes = use_peepholes;
        self
    }

    /// Initialize the encoder, layer by layer, from `init`.
    pub fn init<B: Backend>(&self, init: &mut TruncatedNormal, device: &B::Device) -> Encoder<B> {
        let layers = (0..self.num_layers)
            .map(|i| {
                let input_size = if i == 0 {
                    self.input_size
                } else {
                    self.hidden_size
                };
                RecurrentLayer::new(
                    self.cell_type,
                    input_size,
                    self.hidden_size,
                    self.use_peepholes,
                    init,
                    device,
                )
            })
            .collect();

        Encoder {
            layers,
            hidden_size: self.hidden_size,
        }
    }
}

/// One layer of the stack.
#[derive(Module, Debug)]
pub enum RecurrentLayer<B: Backend> {
    /// LSTM layer, optionally with peepholes.
    Lstm(LstmCell<B>),
    /// GRU layer.
    Gru(GruCell<B>),
    /// Simple tanh RNN layer.
    Rnn(SimpleRnnCell<B>),
}

impl<B: Backend> RecurrentLayer<B> {
    fn new(
        cell_type: CellType,
        input_size: usize,
        hidden_size: usize,
        use_peepholes: bool,
        init: &mut TruncatedNormal,
        device: &B::Device,
    ) -> Self {
        match cell_type {
            CellType::LSTM => Self::Lstm(LstmCell::new(
                input_size,
                hidden_size,
                use_peepholes,
                init,
                device,
            )),
            CellType::GRU => Self::Gru(GruCell::new(input_size, hidden_size, init, device)),
            CellType::RNN => Self::Rnn(SimpleRnnCell::new(input_size, hidden_size, init, device)),
        }
    }

    /// Cell kind of this layer.
    pub fn cell_type(&self) -> CellType {
        match self {
            Self::Lstm(_) => CellType::LSTM,
            Self::Gru(_) => CellType::GRU,
            Self::Rnn(_) => CellType::RNN,
        }
    }

    fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            Self::Lstm(cell) => cell.forward(inputs),
            Self::Gru(cell) => cell.forward(inputs),
            Self::Rnn(cell) => cell.forward(inputs),
        }
    }

    fn l2_penalty(&self) -> Tensor<B, 1> {
        match self {
            Self::Lstm(cell) => cell.l2_penalty(),
            Self::Gru(cell) => cell.l2_penalty(),
            Self::Rnn(cell) => cell.l2_penalty(),
        }
    }
}

/// Stack of recurrent layers; each layer reads the full output sequence of the one below.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    layers: Vec<RecurrentLayer<B>>,
    #[module(skip)]
    hidden_size: usize,
}

impl<B: Backend> Encoder<B> {
    /// Hidden units of the top layer.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Number of stacked layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// The layers, bottom first.
    pub fn layers(&self) -> &[RecurrentLayer<B>] {
        &self.layers
    }

    /// `(B, T, input_size)` to the top layer outputs `(B, T, hidden_size)`.
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        self.layers
            .iter()
            .fold(inputs, |sequence, layer| layer.forward(sequence))
    }

    /// `½·Σw²` over every layer.
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        self.layers
            .iter()
            .map(RecurrentLayer::l2_penalty)
            .reduce(|a, b| a + b)
            .unwrap_or_else(|| {
                let device = self.devices().into_iter().next().unwrap_or_default();
                Tensor::zeros([1], &device)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use frnn_core::Seed;

    type TestBackend = NdArray;

    #[test]
    fn test_stacked_layers() {
        let device = Default::default();
        let mut init = TruncatedNormal::new(0.1, Seed::new(0));
        let encoder = EncoderConfig::new(3, 5)
            .with_num_layers(3)
            .init::<TestBackend>(&mut init, &device);

        assert_eq!(encoder.num_layers(), 3);
        let out = encoder.forward(Tensor::ones([2, 4, 3], &device));
        assert_eq!(out.dims(), [2, 4, 5]);
    }

    #[test]
    fn test_every_cell_type_builds() {
        let device = Default::default();
        for cell_type in [CellType::LSTM, CellType::GRU, CellType::RNN] {
            let mut init = TruncatedNormal::new(0.1, Seed::new(0));
            let encoder = EncoderConfig::new(2, 4)
                .with_num_layers(2)
                .with_cell_type(cell_type)
                .init::<TestBackend>(&mut init, &device);
            assert!(encoder.layers().iter().all(|l| l.cell_type() == cell_type));
            let out = encoder.forward(Tensor::zeros([1, 3, 2], &device));
            assert_eq!(out.dims(), [1, 3, 4]);
        }
    }

    #[test]
    fn test_layer_variant_matches_cell_type() {
        let device = Default::default();
        let mut init = TruncatedNormal::new(0.1, Seed::new(0));
        let encoder = EncoderConfig::new(1, 2)
            .with_cell_type(CellType::GRU)
            .init::<TestBackend>(&mut init, &device);
        assert!(matches!(encoder.layers()[0], RecurrentLayer::Gru(_)));

        let encoder = EncoderConfig::new(1, 2)
            .with_peepholes(false)
            .init::<TestBackend>(&mut init, &device);
        match &encoder.layers()[0] {
            RecurrentLayer::Lstm(cell) => assert!(!cell.has_peepholes()),
            other => panic!("expected an LSTM layer, got {:?}", other.cell_type()),
        }
    }

    #[test]
    fn test_penalty_sums_layers() {
        let device = Default::default();
        let one = EncoderConfig::new(2, 4)
            .init::<TestBackend>(&mut TruncatedNormal::new(0.3, Seed::new(2)), &device);
        let two = EncoderConfig::new(2, 4)
            .with_num_layers(2)
            .init::<TestBackend>(&mut TruncatedNormal::new(0.3, Seed::new(2)), &device);

        let a: f32 = one.l2_penalty().into_scalar();
        let b: f32 = two.l2_penalty().into_scalar();
        assert!(b > a);
    }
}
