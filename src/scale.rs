//! Feature standardization to zero mean / unit variance.
//!
//! Statistics are population statistics over the current run's customers
//! and are never persisted. A zero-variance feature standardizes to 0.0 for
//! every row rather than dividing by zero.

use ndarray::{Array1, Array2, Axis};

/// Per-column mean/std fitted on one run's feature matrix.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations.
    pub fn fit(features: &Array2<f64>) -> Self {
        let n = features.nrows().max(1) as f64;
        let means = features.sum_axis(Axis(0)) / n;
        let stds = features
            .axis_iter(Axis(1))
            .zip(means.iter())
            .map(|(column, &mean)| {
                (column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            })
            .collect::<Array1<f64>>();
        StandardScaler { means, stds }
    }

    /// Standardize a matrix with the fitted statistics.
    pub fn transform(&self, features: &Array2<f64>) -> Array2<f64> {
        let mut scaled = features.clone();
        for mut row in scaled.axis_iter_mut(Axis(0)) {
            for (j, value) in row.iter_mut().enumerate() {
                *value = if self.stds[j] > 0.0 {
                    (*value - self.means[j]) / self.stds[j]
                } else {
                    0.0
                };
            }
        }
        scaled
    }

    /// Indices of features with zero variance in the fitted population.
    pub fn degenerate_features(&self) -> Vec<usize> {
        self.stds
            .iter()
            .enumerate()
            .filter(|(_, &std)| std <= 0.0)
            .map(|(j, _)| j)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn standardizes_to_zero_mean_unit_variance() {
        let features = array![[1.0, 10.0, 100.0], [3.0, 30.0, 300.0]];
        let scaler = StandardScaler::fit(&features);
        let scaled = scaler.transform(&features);

        for j in 0..3 {
            let column: Vec<f64> = scaled.column(j).to_vec();
            let mean: f64 = column.iter().sum::<f64>() / column.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert_eq!(column, vec![-1.0, 1.0]);
        }
    }

    #[test]
    fn zero_variance_feature_maps_to_zero() {
        // All customers identical on the middle axis; also a single-row
        // population, where every feature is degenerate.
        let features = array![[1.0, 5.0, 100.0], [3.0, 5.0, 300.0]];
        let scaler = StandardScaler::fit(&features);
        let scaled = scaler.transform(&features);

        assert_eq!(scaler.degenerate_features(), vec![1]);
        assert_eq!(scaled.column(1).to_vec(), vec![0.0, 0.0]);
        assert!(scaled.iter().all(|v| v.is_finite()));

        let single = array![[4.0, 2.0, 9.0]];
        let scaler = StandardScaler::fit(&single);
        assert_eq!(scaler.degenerate_features(), vec![0, 1, 2]);
        assert_eq!(scaler.transform(&single).row(0).to_vec(), vec![0.0, 0.0, 0.0]);
    }
}
