//! Regression models for the price experiments.
//!
//! Everything here speaks the same two-method contract so the hybrid
//! estimator (and the training loop) can swap implementations freely:
//! fit on a feature matrix and target vector, then predict row-aligned
//! values.

use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::ModelError;

pub mod boosted;
pub mod hybrid;
pub mod linear;
pub mod tuning;

pub use boosted::*;
pub use hybrid::*;
pub use linear::*;
pub use tuning::*;

/// The fit/predict contract shared by every candidate stage.
pub trait Regressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError>;
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;
}

/// Seasonal persistence: predicts the price observed one week earlier by
/// reading a lag column out of the feature matrix. Needs no training.
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    feature_index: usize,
}

impl SeasonalNaive {
    pub fn new(feature_index: usize) -> Self {
        Self { feature_index }
    }
}

impl Regressor for SeasonalNaive {
    fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<(), ModelError> {
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        x.iter()
            .enumerate()
            .map(|(row, features)| {
                features
                    .get(self.feature_index)
                    .copied()
                    .ok_or(ModelError::RaggedFeatures {
                        row,
                        expected: self.feature_index + 1,
                        got: features.len(),
                    })
            })
            .collect()
    }
}

/// Flatten row-major feature vectors into the matrix type smartcore wants.
pub(crate) fn dense_from_rows(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>, ModelError> {
    let n_samples = rows.len();
    if n_samples == 0 {
        return Err(ModelError::EmptyMatrix);
    }
    let n_features = rows[0].len();
    let mut flat = Vec::with_capacity(n_samples * n_features);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n_features {
            return Err(ModelError::RaggedFeatures {
                row: i,
                expected: n_features,
                got: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }
    Ok(DenseMatrix::new(n_samples, n_features, flat, false))
}

pub(crate) fn check_targets(x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
    if x.len() != y.len() {
        return Err(ModelError::TargetMismatch {
            features: x.len(),
            targets: y.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasonal_naive_reads_the_lag_column() {
        let naive = SeasonalNaive::new(1);
        let x = vec![vec![5.0, 91.0], vec![6.0, 87.5]];
        assert_eq!(naive.predict(&x).unwrap(), vec![91.0, 87.5]);
    }

    #[test]
    fn seasonal_naive_rejects_short_rows() {
        let naive = SeasonalNaive::new(3);
        let x = vec![vec![5.0, 91.0]];
        assert!(matches!(
            naive.predict(&x),
            Err(ModelError::RaggedFeatures { .. })
        ));
    }

    #[test]
    fn dense_from_rows_rejects_ragged_input() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            dense_from_rows(&rows),
            Err(ModelError::RaggedFeatures {
                row: 1,
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn dense_from_rows_rejects_empty_input() {
        assert!(matches!(dense_from_rows(&[]), Err(ModelError::EmptyMatrix)));
    }
}
