//! Gradient-boosted regression trees built from smartcore decision trees.
//!
//! Each round fits a depth-limited tree on the running residual and adds a
//! learning-rate-scaled step to the ensemble prediction. Deterministic for
//! a given dataset and parameter set.

use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

use super::{check_targets, dense_from_rows, Regressor};
use crate::config::BoostingConfig;
use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
}

impl From<&BoostingConfig> for BoostingParams {
    fn from(cfg: &BoostingConfig) -> Self {
        Self {
            n_estimators: cfg.n_estimators,
            learning_rate: cfg.learning_rate,
            max_depth: cfg.max_depth,
        }
    }
}

pub struct GradientBoostedTrees {
    params: BoostingParams,
    base_prediction: f64,
    trees: Vec<DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
}

impl GradientBoostedTrees {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            base_prediction: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> BoostingParams {
        self.params
    }

    fn tree_parameters(&self) -> DecisionTreeRegressorParameters {
        DecisionTreeRegressorParameters::default().with_max_depth(self.params.max_depth)
    }
}

impl Regressor for GradientBoostedTrees {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        check_targets(x, y)?;
        let matrix = dense_from_rows(x)?;

        self.base_prediction = y.iter().sum::<f64>() / y.len() as f64;
        self.trees = Vec::with_capacity(self.params.n_estimators);

        let mut residual: Vec<f64> = y.iter().map(|t| t - self.base_prediction).collect();
        for _ in 0..self.params.n_estimators {
            let tree = DecisionTreeRegressor::fit(&matrix, &residual, self.tree_parameters())
                .map_err(|e| ModelError::Library(format!("tree fit failed: {e:?}")))?;
            let step = tree
                .predict(&matrix)
                .map_err(|e| ModelError::Library(format!("tree predict failed: {e:?}")))?;
            for (r, s) in residual.iter_mut().zip(&step) {
                *r -= self.params.learning_rate * s;
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let matrix = dense_from_rows(x)?;
        let mut predictions = vec![self.base_prediction; x.len()];
        for tree in &self.trees {
            let step = tree
                .predict(&matrix)
                .map_err(|e| ModelError::Library(format!("tree predict failed: {e:?}")))?;
            for (p, s) in predictions.iter_mut().zip(&step) {
                *p += self.params.learning_rate * s;
            }
        }
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonlinear_dataset() -> (Vec<Vec<f64>>, Vec<f64>) {
        // A step function a single mean cannot represent.
        let x: Vec<Vec<f64>> = (0..80).map(|i| vec![i as f64]).collect();
        let y = x
            .iter()
            .map(|r| if r[0] < 40.0 { 10.0 } else { 50.0 })
            .collect();
        (x, y)
    }

    fn params(n: usize) -> BoostingParams {
        BoostingParams {
            n_estimators: n,
            learning_rate: 0.3,
            max_depth: 3,
        }
    }

    #[test]
    fn boosting_beats_the_constant_mean() {
        let (x, y) = nonlinear_dataset();
        let mut model = GradientBoostedTrees::new(params(50));
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();

        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let mae_model: f64 =
            preds.iter().zip(&y).map(|(p, t)| (p - t).abs()).sum::<f64>() / y.len() as f64;
        let mae_mean: f64 = y.iter().map(|t| (t - mean).abs()).sum::<f64>() / y.len() as f64;
        assert!(
            mae_model < mae_mean / 4.0,
            "boosting mae {mae_model} vs mean mae {mae_mean}"
        );
    }

    #[test]
    fn fit_is_deterministic() {
        let (x, y) = nonlinear_dataset();
        let mut a = GradientBoostedTrees::new(params(20));
        let mut b = GradientBoostedTrees::new(params(20));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let model = GradientBoostedTrees::new(params(5));
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn target_length_mismatch_is_rejected() {
        let mut model = GradientBoostedTrees::new(params(5));
        assert!(matches!(
            model.fit(&[vec![1.0], vec![2.0]], &[1.0]),
            Err(ModelError::TargetMismatch { .. })
        ));
    }
}
