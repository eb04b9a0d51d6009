//! Weight penalties.

use burn::prelude::*;

/// `½·Σw²` of one tensor, as a single-element tensor.
pub fn l2_loss<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Tensor<B, 1> {
    tensor.powf_scalar(2.0).sum().mul_scalar(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    #[test]
    fn test_l2_loss_halves_sum_of_squares() {
        let device = Default::default();
        let w = Tensor::<NdArray, 2>::from_data([[1.0f32, -2.0], [3.0, 0.0]], &device);
        let loss: f32 = l2_loss(w).into_scalar();
        assert!((loss - 7.0).abs() < 1e-6);
    }
}
