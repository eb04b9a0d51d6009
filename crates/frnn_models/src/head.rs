//! Dense projection from encoder states to the forecast horizon.

use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;

use crate::init::TruncatedNormal;
use crate::penalty::l2_loss;

/// Build the `hidden_size -> output_size` projection.
///
/// The weight is drawn from `init` so the head continues the encoder's
/// parameter stream; the optional bias starts at zero.
pub fn dense_head<B: Backend>(
    hidden_size: usize,
    output_size: usize,
    use_bias: bool,
    init: &mut TruncatedNormal,
    device: &B::Device,
) -> Linear<B> {
    let mut linear = LinearConfig::new(hidden_size, output_size)
        .with_bias(use_bias)
        .with_initializer(Initializer::Zeros)
        .init(device);
    linear.weight = init.matrix(hidden_size, output_size, device);
    linear
}

/// `½·Σw²` over the weight and bias of a projection.
pub fn dense_l2_penalty<B: Backend>(head: &Linear<B>) -> Tensor<B, 1> {
    let penalty = l2_loss(head.weight.val());
    match &head.bias {
        Some(bias) => penalty + l2_loss(bias.val()),
        None => penalty,
    }
}
