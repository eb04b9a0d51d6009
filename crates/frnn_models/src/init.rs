//! Seeded parameter initialization.

use burn::module::Param;
use burn::prelude::*;
use burn::tensor::TensorData;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use frnn_core::Seed;

/// Zero-mean normal initializer that redraws samples beyond two standard deviations.
///
/// Values are drawn on the host from a ChaCha stream so that parameter
/// initialization never depends on a backend-global RNG.
#[derive(Debug, Clone)]
pub struct TruncatedNormal {
    stdev: f64,
    rng: ChaCha8Rng,
}

impl TruncatedNormal {
    /// Create an initializer seeded from `seed`.
    #[must_use]
    pub fn new(stdev: f64, seed: Seed) -> Self {
        Self {
            stdev,
            rng: seed.to_rng(),
        }
    }

    /// Standard deviation before truncation.
    #[must_use]
    pub fn stdev(&self) -> f64 {
        self.stdev
    }

    /// Draw `n` values.
    pub fn sample(&mut self, n: usize) -> Vec<f32> {
        let bound = 2.0 * self.stdev;
        let normal = match Normal::new(0.0, self.stdev) {
            Ok(normal) => normal,
            // Degenerate stdev: everything collapses to the mean.
            Err(_) => return vec![0.0; n],
        };
        (0..n)
            .map(|_| loop {
                let value: f64 = normal.sample(&mut self.rng);
                if value.abs() <= bound {
                    break value as f32;
                }
            })
            .collect()
    }

    /// A `[rows, cols]` trainable matrix.
    pub fn matrix<B: Backend>(
        &mut self,
        rows: usize,
        cols: usize,
        device: &B::Device,
    ) -> Param<Tensor<B, 2>> {
        let data = TensorData::new(self.sample(rows * cols), [rows, cols]);
        Param::from_tensor(Tensor::from_data(data, device))
    }

    /// A `[len]` trainable vector.
    pub fn vector<B: Backend>(&mut self, len: usize, device: &B::Device) -> Param<Tensor<B, 1>> {
        let data = TensorData::new(self.sample(len), [len]);
        Param::from_tensor(Tensor::from_data(data, device))
    }
}

/// A `[len]` trainable vector filled with `value`.
pub fn constant_vector<B: Backend>(len: usize, value: f32, device: &B::Device) -> Param<Tensor<B, 1>> {
    Param::from_tensor(Tensor::full([len], value, device))
}
