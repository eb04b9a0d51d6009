//! The interface every forecasting architecture implements.

use burn::prelude::*;

use crate::forecast::ModelConfig;

/// Predictions aligned with their targets for the training loss.
#[derive(Debug, Clone)]
pub struct TrainingPairs<B: Backend> {
    /// `(B, S, output_size)` model outputs.
    pub predictions: Tensor<B, 3>,
    /// `(B, S, output_size)` targets at the same steps.
    pub targets: Tensor<B, 3>,
    /// One on steps that count toward the loss; `None` when every step counts.
    pub mask: Option<Tensor<B, 3>>,
}

/// A recurrent forecaster that owns one set of trainable weights.
///
/// On an autodiff backend the module is the training path; its
/// `AutodiffModule::valid()` copy is the inference path over the same weights.
pub trait ForecastModel<B: Backend>: Module<B> + Sized {
    /// Build freshly initialized parameters.
    fn init(config: &ModelConfig, device: &B::Device) -> Self;

    /// Forecast rows `(B, output_size)` read at each sequence's last valid step.
    fn forecast(&self, inputs: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 2>;

    /// Outputs and targets compared by the training error.
    fn training_pairs(
        &self,
        inputs: Tensor<B, 3>,
        targets: Tensor<B, 3>,
        lengths: &[usize],
    ) -> TrainingPairs<B>;

    /// `½·Σw²` over every trainable parameter.
    fn l2_penalty(&self) -> Tensor<B, 1>;
}
