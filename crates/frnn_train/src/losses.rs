//! Loss functions.
//!
//! The training objective is a mean absolute error plus an L2 penalty over
//! every trainable parameter.

use burn::prelude::*;

use frnn_models::{scalar, ForecastModel, TrainingPairs};

/// Mean absolute error.
#[derive(Debug, Default, Clone, Copy)]
pub struct L1Loss;

impl L1Loss {
    /// Create a new L1 loss.
    pub fn new() -> Self {
        Self
    }

    /// `mean(|targets - preds|)`.
    pub fn forward<B: Backend, const D: usize>(
        &self,
        preds: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        (targets - preds).abs().mean()
    }

    /// Mean absolute error over the entries where `mask` is one.
    pub fn forward_masked<B: Backend>(
        &self,
        preds: Tensor<B, 3>,
        targets: Tensor<B, 3>,
        mask: Tensor<B, 3>,
    ) -> Tensor<B, 1> {
        let count = mask.clone().sum().clamp_min(1.0);
        ((targets - preds).abs() * mask).sum() / count
    }

    /// Error between aligned training pairs, honoring their mask.
    pub fn forward_pairs<B: Backend>(&self, pairs: TrainingPairs<B>) -> Tensor<B, 1> {
        match pairs.mask {
            Some(mask) => self.forward_masked(pairs.predictions, pairs.targets, mask),
            None => self.forward(pairs.predictions, pairs.targets),
        }
    }
}

/// One evaluated training objective.
#[derive(Debug, Clone)]
pub struct ComposedLoss<B: Backend> {
    /// Differentiable `error + l2_regularization * penalty`.
    pub objective: Tensor<B, 1>,
    /// Primary error, widened to f64.
    pub error: f64,
    /// Unscaled `½·Σw²`, widened to f64.
    pub penalty: f64,
    /// `error + l2_regularization * penalty`, summed in f64.
    pub total: f64,
}

/// Combines the L1 error with the scaled L2 penalty.
#[derive(Debug, Clone, Copy)]
pub struct RegularizedLoss {
    l1: L1Loss,
    l2_regularization: f64,
}

impl RegularizedLoss {
    /// Create the composer for one L2 coefficient.
    pub fn new(l2_regularization: f64) -> Self {
        Self {
            l1: L1Loss::new(),
            l2_regularization,
        }
    }

    /// The L2 coefficient.
    pub fn l2_regularization(&self) -> f64 {
        self.l2_regularization
    }

    /// Evaluate the objective for one minibatch.
    ///
    /// Backends train in f32, so `objective` and its gradients are f32. The
    /// reported `error`, `penalty` and `total` are read back and combined in
    /// f64; a coefficient too small to move the f32 objective still shows up
    /// in `total`.
    pub fn forward<B: Backend, M: ForecastModel<B>>(
        &self,
        model: &M,
        pairs: TrainingPairs<B>,
    ) -> ComposedLoss<B> {
        let error = self.l1.forward_pairs(pairs);
        let penalty = model.l2_penalty();

        let error_value = scalar(error.clone());
        let penalty_value = scalar(penalty.clone());

        ComposedLoss {
            objective: error + penalty.mul_scalar(self.l2_regularization),
            error: error_value,
            penalty: penalty_value,
            total: error_value + self.l2_regularization * penalty_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use frnn_models::{ModelConfig, Seq2SeqDense};

    type TestBackend = NdArray;

    #[test]
    fn test_l1_loss() {
        let device = Default::default();
        let preds = Tensor::<TestBackend, 2>::from_data([[1.0f32, 2.0], [3.0, 4.0]], &device);
        let targets = Tensor::<TestBackend, 2>::from_data([[1.0f32, 0.0], [4.0, 4.0]], &device);
        let loss: f32 = L1Loss::new().forward(preds, targets).into_scalar();
        assert!((loss - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_masked_l1_ignores_padding() {
        let device = Default::default();
        let preds = Tensor::<TestBackend, 3>::from_data([[[1.0f32], [100.0]]], &device);
        let targets = Tensor::<TestBackend, 3>::from_data([[[3.0f32], [0.0]]], &device);
        let mask = Tensor::<TestBackend, 3>::from_data([[[1.0f32], [0.0]]], &device);
        let loss: f32 = L1Loss::new().forward_masked(preds, targets, mask).into_scalar();
        assert!((loss - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_coefficient_leaves_error_only() {
        let device = Default::default();
        let model: Seq2SeqDense<TestBackend> = ModelConfig::new(1, 1)
            .with_initializer_stdev(0.5)
            .init(&device);
        let pairs = model.training_pairs(
            Tensor::ones([2, 3, 1], &device),
            Tensor::ones([2, 3, 1], &device),
            &[3, 2],
        );

        let loss = RegularizedLoss::new(0.0).forward(&model, pairs.clone());
        assert!(loss.penalty > 0.0);
        assert_eq!(loss.total, loss.error);

        let regularized = RegularizedLoss::new(0.1).forward(&model, pairs);
        assert!((regularized.total - (loss.error + 0.1 * loss.penalty)).abs() < 1e-9);
    }

    #[test]
    fn test_total_keeps_tiny_penalty_in_f64() {
        let device = Default::default();
        let model: Seq2SeqDense<TestBackend> = ModelConfig::new(1, 1)
            .with_initializer_stdev(0.5)
            .init(&device);
        let pairs = model.training_pairs(
            Tensor::zeros([1, 2, 1], &device),
            Tensor::ones([1, 2, 1], &device),
            &[2],
        );

        let l2 = 1e-12;
        let loss = RegularizedLoss::new(l2).forward(&model, pairs);
        let objective = scalar(loss.objective.clone());
        assert_eq!(objective, loss.error);
        assert!(loss.total > loss.error);
        let added = loss.total - loss.error;
        assert!((added - l2 * loss.penalty).abs() < 1e-3 * l2 * loss.penalty);
    }
}
