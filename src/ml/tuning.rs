//! Hyperparameter search for the tree ensemble.
//!
//! Ordinary shuffled k-fold would let future hours leak into a fold's
//! training data, so validation is forward-chaining: every fold trains on
//! an expanding prefix and validates on the block that follows it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::ops::Range;

use itertools::iproduct;
use tracing::debug;

use super::{BoostingParams, GradientBoostedTrees, Regressor};
use crate::config::SearchConfig;
use crate::error::ModelError;

/// Expanding-window folds over `len` chronologically ordered rows. Each
/// entry is `(train, validation)` index ranges with every training index
/// preceding every validation index. Returns no folds when the data cannot
/// support the requested count.
pub fn forward_chaining_folds(len: usize, n_folds: usize) -> Vec<(Range<usize>, Range<usize>)> {
    if n_folds == 0 {
        return Vec::new();
    }
    let fold_size = len / (n_folds + 1);
    if fold_size == 0 {
        return Vec::new();
    }
    let min_train = len - n_folds * fold_size;

    (0..n_folds)
        .map(|fold| {
            let train_end = min_train + fold * fold_size;
            let val_end = (train_end + fold_size).min(len);
            (0..train_end, train_end..val_end)
        })
        .collect()
}

/// Draw `iterations` parameter combinations from the grid (seeded, without
/// replacement) and return the one with the lowest mean validation MAE.
/// Ties keep the earlier draw.
pub fn randomized_search(
    x: &[Vec<f64>],
    y: &[f64],
    cfg: &SearchConfig,
) -> Result<BoostingParams, ModelError> {
    let grid: Vec<BoostingParams> = iproduct!(
        cfg.n_estimators.iter(),
        cfg.learning_rate.iter(),
        cfg.max_depth.iter()
    )
    .map(|(n, lr, depth)| BoostingParams {
        n_estimators: *n,
        learning_rate: *lr,
        max_depth: *depth,
    })
    .collect();
    if grid.is_empty() {
        return Err(ModelError::EmptyGrid);
    }

    let folds = forward_chaining_folds(x.len(), cfg.cv_folds);
    if folds.is_empty() {
        return Err(ModelError::Library(format!(
            "{} training rows cannot support {}-fold forward-chaining validation",
            x.len(),
            cfg.cv_folds
        )));
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let sampled: Vec<&BoostingParams> = grid
        .choose_multiple(&mut rng, cfg.iterations.max(1))
        .collect();

    let mut best: Option<(BoostingParams, f64)> = None;
    for params in sampled {
        let mut fold_maes = Vec::with_capacity(folds.len());
        for (train, val) in &folds {
            let mut model = GradientBoostedTrees::new(*params);
            model.fit(&x[train.clone()], &y[train.clone()])?;
            let preds = model.predict(&x[val.clone()])?;
            let mae = preds
                .iter()
                .zip(&y[val.clone()])
                .map(|(p, t)| (p - t).abs())
                .sum::<f64>()
                / preds.len() as f64;
            fold_maes.push(mae);
        }
        let mean_mae = fold_maes.iter().sum::<f64>() / fold_maes.len() as f64;
        debug!(?params, mean_mae, "scored grid draw");
        if best.as_ref().map_or(true, |(_, b)| mean_mae < *b) {
            best = Some((*params, mean_mae));
        }
    }

    // sampled is non-empty, so best is always set.
    best.map(|(p, _)| p).ok_or(ModelError::EmptyGrid)
}

/// Boosted ensemble whose hyperparameters are chosen by the randomized
/// search as part of `fit`. Only the training data it is fitted on is ever
/// seen by the search.
pub struct TunedGradientBoosting {
    search: SearchConfig,
    inner: Option<GradientBoostedTrees>,
}

impl TunedGradientBoosting {
    pub fn new(search: SearchConfig) -> Self {
        Self {
            search,
            inner: None,
        }
    }

    pub fn chosen_params(&self) -> Option<BoostingParams> {
        self.inner.as_ref().map(|m| m.params())
    }
}

impl Regressor for TunedGradientBoosting {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let params = randomized_search(x, y, &self.search)?;
        let mut model = GradientBoostedTrees::new(params);
        model.fit(x, y)?;
        self.inner = Some(model);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        self.inner
            .as_ref()
            .ok_or(ModelError::NotFitted)?
            .predict(x)
    }
}
