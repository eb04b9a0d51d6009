//! Encoder with a dense projection at every step.

use burn::nn::Linear;
use burn::prelude::*;

use super::config::ModelConfig;
use crate::gather::{final_step, valid_steps};
use crate::head::{dense_head, dense_l2_penalty};
use crate::rnn::Encoder;
use crate::traits::{ForecastModel, TrainingPairs};

/// Stacked forecaster trained on every valid step of each window.
///
/// Every encoder state is projected to the forecast horizon; the loss covers
/// all non-padding steps, while forecasts are read at the last valid step.
#[derive(Module, Debug)]
pub struct Stacking<B: Backend> {
    encoder: Encoder<B>,
    head: Linear<B>,
}

impl<B: Backend> Stacking<B> {
    /// Projections at every step, `(B, T, output_size)`.
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        self.head.forward(self.encoder.forward(inputs))
    }
}

impl<B: Backend> ForecastModel<B> for Stacking<B> {
    fn init(config: &ModelConfig, device: &B::Device) -> Self {
        let mut init = config.initializer();
        let encoder = config.encoder().init(&mut init, device);
        let head = dense_head(
            config.cell_dimension,
            config.output_size,
            config.use_bias,
            &mut init,
            device,
        );
        Self { encoder, head }
    }

    fn forecast(&self, inputs: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 2> {
        final_step(self.forward(inputs), lengths)
    }

    fn training_pairs(
        &self,
        inputs: Tensor<B, 3>,
        targets: Tensor<B, 3>,
        lengths: &[usize],
    ) -> TrainingPairs<B> {
        let [_, steps, output_size] = targets.dims();
        let mask = valid_steps(lengths, steps, output_size, &targets.device());

        TrainingPairs {
            predictions: self.forward(inputs),
            targets,
            mask: Some(mask),
        }
    }

    fn l2_penalty(&self) -> Tensor<B, 1> {
        self.encoder.l2_penalty() + dense_l2_penalty(&self.head)
    }
}
