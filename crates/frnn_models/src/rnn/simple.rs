//! Fully-connected recurrent cell.

use burn::module::Param;
use burn::prelude::*;

use crate::init::{constant_vector, TruncatedNormal};
use crate::penalty::l2_loss;

/// Plain RNN cell, `h' = tanh(x·W + h·U + b)`.
#[derive(Module, Debug)]
pub struct SimpleRnnCell<B: Backend> {
    kernel: Param<Tensor<B, 2>>,
    recurrent_kernel: Param<Tensor<B, 2>>,
    bias: Param<Tensor<B, 1>>,
    #[module(skip)]
    hidden_size: usize,
}

impl<B: Backend> SimpleRnnCell<B> {
    /// Create a cell, drawing both kernels from `init`.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        init: &mut TruncatedNormal,
        device: &B::Device,
    ) -> Self {
        Self {
            kernel: init.matrix(input_size, hidden_size, device),
            recurrent_kernel: init.matrix(hidden_size, hidden_size, device),
            bias: constant_vector(hidden_size, 0.0, device),
            hidden_size,
        }
    }

    /// Number of hidden units.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// One step.
    pub fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        (x.matmul(self.kernel.val())
            + h.matmul(self.recurrent_kernel.val())
            + self.bias.val().unsqueeze::<2>())
        .tanh()
    }

    /// Run over a whole `(B, T, F)` sequence from a zero state.
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, steps, features] = inputs.dims();
        let mut h = Tensor::zeros([batch, self.hidden_size], &inputs.device());
        let mut outputs = Vec::with_capacity(steps);

        for t in 0..steps {
            let x = inputs
                .clone()
                .slice([0..batch, t..t + 1, 0..features])
                .reshape([batch, features]);
            h = self.step(x, h);
            outputs.push(h.clone().reshape([batch, 1, self.hidden_size]));
        }

        Tensor::cat(outputs, 1)
    }

    /// `½·Σw²` over every parameter of the cell.
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        l2_loss(self.kernel.val()) + l2_loss(self.recurrent_kernel.val()) + l2_loss(self.bias.val())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use frnn_core::Seed;

    type TestBackend = NdArray;

    #[test]
    fn test_outputs_are_bounded() {
        let device = Default::default();
        let mut init = TruncatedNormal::new(2.0, Seed::new(5));
        let cell = SimpleRnnCell::<TestBackend>::new(2, 4, &mut init, &device);

        let out = cell.forward(Tensor::ones([2, 6, 2], &device).mul_scalar(10.0));
        assert_eq!(out.dims(), [2, 6, 4]);
        let max: f32 = out.abs().max().into_scalar();
        assert!(max <= 1.0);
    }
}
