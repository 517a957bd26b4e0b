//! Two-stage residual-correcting estimator.
//!
//! A linear stage captures the trend; a tree stage is then fit on the
//! linear stage's in-sample residuals, so it can only learn structure the
//! linear model missed. Prediction is the elementwise sum of both stages.

use super::{check_targets, GradientBoostedTrees, Regressor, RidgeModel};
use crate::config::ModelsConfig;
use crate::error::ModelError;

pub struct HybridRegressor {
    linear: Box<dyn Regressor>,
    tree: Box<dyn Regressor>,
}

impl HybridRegressor {
    /// Compose any two stages honoring the fit/predict contract.
    pub fn new(linear: Box<dyn Regressor>, tree: Box<dyn Regressor>) -> Self {
        Self { linear, tree }
    }

    /// The default pairing: ridge plus boosted trees with the configured
    /// fixed hyperparameters.
    pub fn from_config(cfg: &ModelsConfig) -> Self {
        Self::new(
            Box::new(RidgeModel::new(cfg.ridge_alpha)),
            Box::new(GradientBoostedTrees::new((&cfg.hybrid).into())),
        )
    }
}

impl Regressor for HybridRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        check_targets(x, y)?;
        self.linear.fit(x, y)?;
        let base = self.linear.predict(x)?;
        let residuals: Vec<f64> = y.iter().zip(&base).map(|(t, b)| t - b).collect();
        self.tree.fit(x, &residuals)
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let base = self.linear.predict(x)?;
        let correction = self.tree.predict(x)?;
        Ok(base
            .iter()
            .zip(&correction)
            .map(|(b, c)| b + c)
            .collect())
    }
}
