//! Length-aware selection over padded sequences.

use burn::prelude::*;
use burn::tensor::{Int, TensorData};

/// Row `lengths[i] - 1` of every sequence in `(B, T, F)`, as `(B, F)`.
///
/// A single gather along the time axis; padded rows are never selected.
///
/// # Panics
///
/// Panics if `lengths` does not have one entry per sequence or a length is zero.
pub fn final_step<B: Backend>(sequence: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 2> {
    let [batch, _, width] = sequence.dims();
    assert_eq!(lengths.len(), batch, "one length per sequence");

    let indices: Vec<i64> = lengths
        .iter()
        .flat_map(|&length| std::iter::repeat((length - 1) as i64).take(width))
        .collect();
    let indices = Tensor::<B, 3, Int>::from_data(
        TensorData::new(indices, [batch, 1, width]),
        &sequence.device(),
    );

    sequence.gather(1, indices).reshape([batch, width])
}

/// `(B, T, width)` mask, one on steps before each length and zero on padding.
pub fn valid_steps<B: Backend>(
    lengths: &[usize],
    steps: usize,
    width: usize,
    device: &B::Device,
) -> Tensor<B, 3> {
    let mask: Vec<f32> = lengths
        .iter()
        .flat_map(|&length| {
            (0..steps).flat_map(move |t| {
                let value = if t < length { 1.0 } else { 0.0 };
                std::iter::repeat(value).take(width)
            })
        })
        .collect();
    Tensor::from_data(TensorData::new(mask, [lengths.len(), steps, width]), device)
}
