//! Encoder with a dense projection of the final valid state.

use burn::nn::Linear;
use burn::prelude::*;

use super::config::ModelConfig;
use crate::gather::final_step;
use crate::head::{dense_head, dense_l2_penalty};
use crate::rnn::Encoder;
use crate::traits::{ForecastModel, TrainingPairs};

/// Sequence-to-sequence forecaster whose decoder is a single dense layer.
///
/// The encoder state at each sequence's last valid step is projected to the
/// whole forecast horizon at once. Training compares that projection with
/// the target row at the same step.
#[derive(Module, Debug)]
pub struct Seq2SeqDense<B: Backend> {
    encoder: Encoder<B>,
    head: Linear<B>,
}

impl<B: Backend> Seq2SeqDense<B> {
    /// The recurrent encoder.
    pub fn encoder(&self) -> &Encoder<B> {
        &self.encoder
    }

    /// The projection head.
    pub fn head(&self) -> &Linear<B> {
        &self.head
    }
}

impl<B: Backend> ForecastModel<B> for Seq2SeqDense<B> {
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
        let states = self.encoder.forward(inputs);
        self.head.forward(final_step(states, lengths))
    }

    fn training_pairs(
        &self,
        inputs: Tensor<B, 3>,
        targets: Tensor<B, 3>,
        lengths: &[usize],
    ) -> TrainingPairs<B> {
        let [batch, _, output_size] = targets.dims();
        let predictions = self.forecast(inputs, lengths).reshape([batch, 1, output_size]);
        let targets = final_step(targets, lengths).reshape([batch, 1, output_size]);

        TrainingPairs {
            predictions,
            targets,
            mask: None,
        }
    }

    fn l2_penalty(&self) -> Tensor<B, 1> {
        self.encoder.l2_penalty() + dense_l2_penalty(&self.head)
    }
}
