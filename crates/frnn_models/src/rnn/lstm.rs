//! LSTM cell with optional peephole connections.

use burn::module::Param;
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use crate::init::{constant_vector, TruncatedNormal};
use crate::penalty::l2_loss;

/// Added to the forget gate pre-activation so that fresh cells start remembering.
pub const FORGET_BIAS: f32 = 1.0;

/// Diagonal peephole weights.
#[derive(Module, Debug)]
pub struct Peepholes<B: Backend> {
    /// Input gate view of the previous cell state.
    input: Param<Tensor<B, 1>>,
    /// Forget gate view of the previous cell state.
    forget: Param<Tensor<B, 1>>,
    /// Output gate view of the new cell state.
    output: Param<Tensor<B, 1>>,
}

/// Long short-term memory cell.
///
/// Gates come from one fused kernel over `[x, h]` in the order input,
/// candidate, forget, output. With peepholes the input and forget gates also
/// see the previous cell state and the output gate sees the new one.
#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    /// `[input_size + hidden_size, 4 * hidden_size]`.
    kernel: Param<Tensor<B, 2>>,
    /// `[4 * hidden_size]`, zero-initialized.
    bias: Param<Tensor<B, 1>>,
    peepholes: Option<Peepholes<B>>,
    #[module(skip)]
    hidden_size: usize,
}

impl<B: Backend> LstmCell<B> {
    /// Create a cell, drawing weights from `init`.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        use_peepholes: bool,
        init: &mut TruncatedNormal,
        device: &B::Device,
    ) -> Self {
        let kernel = init.matrix(input_size + hidden_size, 4 * hidden_size, device);
        let bias = constant_vector(4 * hidden_size, 0.0, device);
        let peepholes = use_peepholes.then(|| Peepholes {
            input: init.vector(hidden_size, device),
            forget: init.vector(hidden_size, device),
            output: init.vector(hidden_size, device),
        });

        Self {
            kernel,
            bias,
            peepholes,
            hidden_size,
        }
    }

    /// Number of hidden units.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Whether the gates observe the cell state.
    pub fn has_peepholes(&self) -> bool {
        self.peepholes.is_some()
    }

    /// One step. Returns the new `(h, c)`.
    pub fn step(
        &self,
        x: Tensor<B, 2>,
        h: Tensor<B, 2>,
        c: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, _] = x.dims();
        let n = self.hidden_size;

        let z = Tensor::cat(vec![x, h], 1).matmul(self.kernel.val())
            + self.bias.val().unsqueeze::<2>();
        let i = z.clone().slice([0..batch, 0..n]);
        let j = z.clone().slice([0..batch, n..2 * n]);
        let f = z.clone().slice([0..batch, 2 * n..3 * n]);
        let o = z.slice([0..batch, 3 * n..4 * n]);

        let (i, f) = match &self.peepholes {
            Some(p) => (
                i + c.clone() * p.input.val().unsqueeze::<2>(),
                f + c.clone() * p.forget.val().unsqueeze::<2>(),
            ),
            None => (i, f),
        };

        let c_new = sigmoid(f.add_scalar(FORGET_BIAS)) * c + sigmoid(i) * j.tanh();

        let o = match &self.peepholes {
            Some(p) => o + c_new.clone() * p.output.val().unsqueeze::<2>(),
            None => o,
        };
        let h_new = sigmoid(o) * c_new.clone().tanh();

        (h_new, c_new)
    }

    /// Run over a whole `(B, T, F)` sequence from a zero state, returning every `h`.
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, steps, features] = inputs.dims();
        let device = inputs.device();

        let mut h = Tensor::zeros([batch, self.hidden_size], &device);
        let mut c = Tensor::zeros([batch, self.hidden_size], &device);
        let mut outputs = Vec::with_capacity(steps);

        for t in 0..steps {
            let x = inputs
                .clone()
                .slice([0..batch, t..t + 1, 0..features])
                .reshape([batch, features]);
            (h, c) = self.step(x, h, c);
            outputs.push(h.clone().reshape([batch, 1, self.hidden_size]));
        }

        Tensor::cat(outputs, 1)
    }

    /// `½·Σw²` over every parameter of the cell.
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        let mut penalty = l2_loss(self.kernel.val()) + l2_loss(self.bias.val());
        if let Some(p) = &self.peepholes {
            penalty = penalty
                + l2_loss(p.input.val())
                + l2_loss(p.forget.val())
                + l2_loss(p.output.val());
        }
        penalty
    }
}
