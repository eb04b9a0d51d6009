//! Forecast accuracy on the original scale.
//!
//! Series are stored in log space after subtracting a level and a seasonal
//! component; scoring undoes both before comparing forecasts with actuals.

use ndarray::{s, Array2, ArrayView2, Zip};

/// Symmetric mean absolute percentage error, in `[0, 2]`.
///
/// `mean(|p - a| / (|p| + |a|)) * 2`. A term where both values are zero
/// counts as zero error and is reported with a warning.
#[derive(Debug, Clone, Default)]
pub struct Smape;

impl Smape {
    /// Score forecasts against actuals of equal shape.
    pub fn compute(&self, preds: ArrayView2<'_, f64>, actuals: ArrayView2<'_, f64>) -> f64 {
        let n = preds.len();
        if n == 0 {
            return 0.0;
        }

        let mut degenerate = 0usize;
        let mut total = 0.0f64;
        Zip::from(&preds).and(&actuals).for_each(|&p, &a| {
            let denominator = p.abs() + a.abs();
            if denominator == 0.0 {
                degenerate += 1;
            } else {
                total += (p - a).abs() / denominator;
            }
        });

        if degenerate > 0 {
            tracing::warn!("{degenerate} SMAPE term(s) had zero forecast and actual; counted as 0");
        }

        total / n as f64 * 2.0
    }
}

/// Map normalized values back to the original scale.
///
/// `values` is `(B, output_size)`; `metadata` holds the last valid metadata
/// row of each example, `(B, output_size + 1)`, with the level in column 0
/// and the seasonality in the remaining columns. Returns
/// `exp(seasonality + level + value)`, minus one when the series were
/// shifted to avoid zeros.
pub fn denormalize(
    values: ArrayView2<'_, f32>,
    metadata: ArrayView2<'_, f32>,
    contain_zero_values: bool,
) -> Array2<f64> {
    let level = metadata.column(0);
    let seasonality = metadata.slice(s![.., 1..]);
    let shift = if contain_zero_values { 1.0 } else { 0.0 };

    let mut out = Array2::<f64>::zeros(values.raw_dim());
    Zip::indexed(&mut out)
        .and(&values)
        .and(&seasonality)
        .for_each(|(row, _), o, &v, &season| {
            let log_value = f64::from(season) + f64::from(level[row]) + f64::from(v);
            *o = log_value.exp() - shift;
        });
    out
}

/// Running mean of per-batch scores.
#[derive(Debug, Clone, Default)]
pub struct BatchMean {
    values: Vec<f64>,
}

impl BatchMean {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one batch score.
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    /// Number of batches seen.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no batch was recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scores in the order they were recorded.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Unweighted mean of the batch scores, `None` before the first batch.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_smape_is_zero_for_exact_forecast() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(Smape.compute(a.view(), a.view()), 0.0);
    }

    #[test]
    fn test_smape_bounds() {
        let p = array![[1.0, 0.0]];
        let a = array![[-1.0, 5.0]];
        // Opposite signs and a zero forecast are both maximal errors.
        assert!((Smape.compute(p.view(), a.view()) - 2.0).abs() < 1e-12);

        let p = array![[110.0]];
        let a = array![[100.0]];
        let value = Smape.compute(p.view(), a.view());
        assert!((value - 2.0 * 10.0 / 210.0).abs() < 1e-12);
        assert!((0.0..=2.0).contains(&value));
    }

    #[test]
    fn test_zero_over_zero_counts_as_zero() {
        let p = array![[0.0, 1.0]];
        let a = array![[0.0, 1.0]];
        assert_eq!(Smape.compute(p.view(), a.view()), 0.0);
    }

    #[test]
    fn test_denormalize_recovers_original_value() {
        let x = 42.0f64;
        let level = 3.0f32;
        let season = 0.25f32;
        let normalized = (x.ln() - f64::from(level) - f64::from(season)) as f32;

        let values = array![[normalized]];
        let metadata = array![[level, season]];
        let back = denormalize(values.view(), metadata.view(), false);
        assert!((back[[0, 0]] - x).abs() < 1e-4);

        // Zero-adjusted data was encoded as log(X + 1).
        let shifted = ((x + 1.0).ln() - f64::from(level) - f64::from(season)) as f32;
        let back = denormalize(array![[shifted]].view(), metadata.view(), true);
        assert!((back[[0, 0]] - x).abs() < 1e-4);
    }

    #[test]
    fn test_batch_mean_is_unweighted() {
        let mut mean = BatchMean::new();
        assert_eq!(mean.mean(), None);
        mean.push(0.5);
        mean.push(0.1);
        assert_eq!(mean.len(), 2);
        assert!((mean.mean().unwrap() - 0.3).abs() < 1e-12);
    }
}
