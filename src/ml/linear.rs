//! Regularized linear model and feature standardization.

use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{RidgeRegression, RidgeRegressionParameters};

use super::{check_targets, dense_from_rows, Regressor};
use crate::error::ModelError;

/// Ridge regression on raw features.
pub struct RidgeModel {
    alpha: f64,
    model: Option<RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
}

impl RidgeModel {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, model: None }
    }
}

impl Regressor for RidgeModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        check_targets(x, y)?;
        let matrix = dense_from_rows(x)?;
        let params = RidgeRegressionParameters::default().with_alpha(self.alpha);
        let model = RidgeRegression::fit(&matrix, &y.to_vec(), params)
            .map_err(|e| ModelError::Library(format!("ridge fit failed: {e:?}")))?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let model = self.model.as_ref().ok_or(ModelError::NotFitted)?;
        let matrix = dense_from_rows(x)?;
        model
            .predict(&matrix)
            .map_err(|e| ModelError::Library(format!("ridge predict failed: {e:?}")))
    }
}

/// Per-column z-score statistics, fit on training data only.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &[Vec<f64>]) -> Result<Self, ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyMatrix);
        }
        let n_features = x[0].len();
        let n = x.len() as f64;

        let mut means = vec![0.0; n_features];
        for (i, row) in x.iter().enumerate() {
            if row.len() != n_features {
                return Err(ModelError::RaggedFeatures {
                    row: i,
                    expected: n_features,
                    got: row.len(),
                });
            }
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0; n_features];
        for row in x {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
        }

        Ok(Self { means, stds })
    }

    /// Constant columns keep a zero z-score rather than dividing by zero.
    pub fn transform(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.stds))
                    .map(|(v, (m, s))| if *s < 1e-10 { 0.0 } else { (v - m) / s })
                    .collect()
            })
            .collect()
    }
}

/// Wraps any regressor with train-time standardization: statistics come
/// from the matrix passed to `fit` and are reused verbatim at predict time.
pub struct Standardized<M> {
    inner: M,
    scaler: Option<StandardScaler>,
}

impl<M: Regressor> Standardized<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            scaler: None,
        }
    }
}

impl<M: Regressor> Regressor for Standardized<M> {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let scaler = StandardScaler::fit(x)?;
        self.inner.fit(&scaler.transform(x), y)?;
        self.scaler = Some(scaler);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let scaler = self.scaler.as_ref().ok_or(ModelError::NotFitted)?;
        self.inner.predict(&scaler.transform(x))
    }
}
