//! Moving batches between `ndarray` host arrays and backend tensors.

use burn::prelude::*;
use burn::tensor::{ElementConversion, TensorData};
use ndarray::{Array2, Array3};

use crate::error::{ModelError, Result};

/// Copy a `(B, T, F)` host array onto `device`.
pub fn tensor_from_array3<B: Backend>(array: &Array3<f32>, device: &B::Device) -> Tensor<B, 3> {
    let (batch, steps, features) = array.dim();
    let data = TensorData::new(array.iter().copied().collect::<Vec<f32>>(), [batch, steps, features]);
    Tensor::from_data(data, device)
}

/// Read a `(B, F)` tensor back to the host.
///
/// # Errors
///
/// Returns an error if the tensor data cannot be read as `f32`.
pub fn array2_from_tensor<B: Backend>(tensor: Tensor<B, 2>) -> Result<Array2<f32>> {
    let [rows, cols] = tensor.dims();
    let values: Vec<f32> = tensor
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| ModelError::Conversion(format!("{e:?}")))?;
    Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| ModelError::ShapeMismatch(e.to_string()))
}

/// Read a single-element tensor as `f64`.
pub fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    tensor.into_scalar().elem::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_host_round_trip_keeps_layout() {
        let device = Default::default();
        let host = Array3::from_shape_fn((2, 3, 1), |(b, t, _)| (b * 10 + t) as f32);
        let tensor = tensor_from_array3::<TestBackend>(&host, &device);
        assert_eq!(tensor.dims(), [2, 3, 1]);

        let last = tensor.slice([0..2, 2..3, 0..1]).reshape([2, 1]);
        let back = array2_from_tensor(last).unwrap();
        assert_eq!(back[[0, 0]], 2.0);
        assert_eq!(back[[1, 0]], 12.0);
    }

    #[test]
    fn test_scalar_widens() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 1>::from_data([0.25f32], &device);
        assert_eq!(scalar(t), 0.25);
    }
}
