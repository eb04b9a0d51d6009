//! Gated recurrent unit.

use burn::module::Param;
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use crate::init::{constant_vector, TruncatedNormal};
use crate::penalty::l2_loss;

/// GRU cell.
///
/// Reset and update gates share one kernel whose bias starts at one; the
/// candidate reads the reset-scaled state. The new state interpolates
/// `h' = u·h + (1 - u)·c`.
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    /// `[input_size + hidden_size, 2 * hidden_size]`.
    gate_kernel: Param<Tensor<B, 2>>,
    gate_bias: Param<Tensor<B, 1>>,
    /// `[input_size + hidden_size, hidden_size]`.
    candidate_kernel: Param<Tensor<B, 2>>,
    candidate_bias: Param<Tensor<B, 1>>,
    #[module(skip)]
    hidden_size: usize,
}

impl<B: Backend> GruCell<B> {
    /// Create a cell, drawing kernels from `init`.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        init: &mut TruncatedNormal,
        device: &B::Device,
    ) -> Self {
        Self {
            gate_kernel: init.matrix(input_size + hidden_size, 2 * hidden_size, device),
            gate_bias: constant_vector(2 * hidden_size, 1.0, device),
            candidate_kernel: init.matrix(input_size + hidden_size, hidden_size, device),
            candidate_bias: constant_vector(hidden_size, 0.0, device),
            hidden_size,
        }
    }

    /// Number of hidden units.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// One step.
    pub fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = x.dims();
        let n = self.hidden_size;

        let gates = sigmoid(
            Tensor::cat(vec![x.clone(), h.clone()], 1).matmul(self.gate_kernel.val())
                + self.gate_bias.val().unsqueeze::<2>(),
        );
        let r = gates.clone().slice([0..batch, 0..n]);
        let u = gates.slice([0..batch, n..2 * n]);

        let candidate = (Tensor::cat(vec![x, r * h.clone()], 1)
            .matmul(self.candidate_kernel.val())
            + self.candidate_bias.val().unsqueeze::<2>())
        .tanh();

        u.clone() * h + u.neg().add_scalar(1.0) * candidate
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
        l2_loss(self.gate_kernel.val())
            + l2_loss(self.gate_bias.val())
            + l2_loss(self.candidate_kernel.val())
            + l2_loss(self.candidate_bias.val())
    }
}
