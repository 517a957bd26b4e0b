//! The experimentation engine.
//!
//! Trains the candidate set on the training window, scores every candidate
//! on the held-out window, selects the winner by mean absolute error, and
//! persists its forecast next to the actuals. Candidates run strictly
//! sequentially; a failing candidate is skipped with a warning and the run
//! continues with the rest.

use tracing::{info, warn};

use crate::config::Config;
use crate::data;
use crate::domain::{EngineeredRow, PRICE_LAG_168_INDEX};
use crate::error::EngineError;
use crate::forecast::{features, metrics::Evaluation, split};
use crate::ml::{
    HybridRegressor, Regressor, RidgeModel, SeasonalNaive, Standardized, TunedGradientBoosting,
};
use crate::tracking::ExperimentTracker;

pub struct Candidate {
    pub name: &'static str,
    /// Whether metrics go to the experiment tracker. The untrained baseline
    /// is logged locally but never tracked.
    pub tracked: bool,
    model: Box<dyn Regressor>,
}

impl Candidate {
    pub fn new(name: &'static str, tracked: bool, model: Box<dyn Regressor>) -> Self {
        Self {
            name,
            tracked,
            model,
        }
    }
}

pub struct ScoredCandidate {
    pub name: &'static str,
    pub predictions: Vec<f64>,
    pub metrics: Evaluation,
}

#[derive(Debug)]
pub struct RunSummary {
    pub winner: String,
    pub best_mae: f64,
    pub scores: Vec<(String, Evaluation)>,
    pub rows_written: usize,
}

/// The four candidates, in evaluation order. Order matters: the selector
/// breaks MAE ties in favor of the earliest candidate, so the simplest
/// models come first.
fn candidate_set(cfg: &Config) -> Vec<Candidate> {
    vec![
        Candidate::new(
            "Baseline",
            false,
            Box::new(SeasonalNaive::new(PRICE_LAG_168_INDEX)),
        ),
        Candidate::new(
            "Ridge_Regression",
            true,
            Box::new(Standardized::new(RidgeModel::new(cfg.models.ridge_alpha))),
        ),
        Candidate::new(
            "Boosted_Trees_Tuned",
            true,
            Box::new(TunedGradientBoosting::new(cfg.models.search.clone())),
        ),
        Candidate::new(
            "Structural_Hybrid",
            true,
            Box::new(HybridRegressor::from_config(&cfg.models)),
        ),
    ]
}

/// Fit and score each candidate in order. Fit, prediction, or shape
/// failures disqualify only the candidate that raised them.
pub fn evaluate_candidates(
    candidates: Vec<Candidate>,
    x_train: &[Vec<f64>],
    y_train: &[f64],
    x_eval: &[Vec<f64>],
    y_eval: &[f64],
    tracker: Option<&dyn ExperimentTracker>,
) -> Vec<ScoredCandidate> {
    let mut scored = Vec::with_capacity(candidates.len());
    for mut candidate in candidates {
        let name = candidate.name;
        let predictions = match candidate
            .model
            .fit(x_train, y_train)
            .and_then(|_| candidate.model.predict(x_eval))
        {
            Ok(p) => p,
            Err(source) => {
                let err = EngineError::CandidateFit {
                    name: name.to_string(),
                    source,
                };
                warn!(candidate = name, error = %err, "candidate excluded from selection");
                continue;
            }
        };
        let metrics = match Evaluation::calculate(y_eval, &predictions) {
            Ok(m) => m,
            Err(err) => {
                warn!(candidate = name, error = %err, "candidate excluded from selection");
                continue;
            }
        };
        if !metrics.mae.is_finite() {
            warn!(candidate = name, mae = metrics.mae, "non-finite score, candidate excluded");
            continue;
        }
        info!(candidate = name, %metrics, "candidate evaluated");

        if candidate.tracked {
            if let Some(tracker) = tracker {
                if let Err(err) = tracker.log_candidate(name, &metrics) {
                    warn!(candidate = name, error = %err, "experiment tracking unavailable, continuing");
                }
            }
        }

        scored.push(ScoredCandidate {
            name,
            predictions,
            metrics,
        });
    }
    scored
}

/// Lowest MAE wins; ties keep the candidate that was evaluated first.
pub fn select_winner(scored: &[ScoredCandidate]) -> Option<&ScoredCandidate> {
    scored.iter().fold(None, |best, candidate| match best {
        Some(b) if b.metrics.mae <= candidate.metrics.mae => Some(b),
        _ => Some(candidate),
    })
}

pub fn run_experiments(
    cfg: &Config,
    tracker: Option<&dyn ExperimentTracker>,
) -> Result<RunSummary, EngineError> {
    let series = data::read_hourly_series(&cfg.data.input_path)?;
    info!(rows = series.len(), "loaded input series");

    let engineered = features::build(&series);
    let (train, eval) = split::chronological(engineered, cfg.split.cutoff)?;
    info!(
        train_rows = train.len(),
        eval_rows = eval.len(),
        cutoff = %cfg.split.cutoff,
        "chronological split complete"
    );

    let x_train: Vec<Vec<f64>> = train.iter().map(EngineeredRow::features).collect();
    let y_train: Vec<f64> = train.iter().map(|r| r.price).collect();
    let x_eval: Vec<Vec<f64>> = eval.iter().map(EngineeredRow::features).collect();
    let y_eval: Vec<f64> = eval.iter().map(|r| r.price).collect();

    let scored = evaluate_candidates(
        candidate_set(cfg),
        &x_train,
        &y_train,
        &x_eval,
        &y_eval,
        tracker,
    );

    let winner = select_winner(&scored).ok_or(EngineError::NoViableCandidate)?;
    info!(
        winner = winner.name,
        mae = winner.metrics.mae,
        "selected winning candidate"
    );

    let rows_written = data::write_results(&cfg.data.output_path, &eval, &winner.predictions)?;
    info!(path = %cfg.data.output_path.display(), rows = rows_written, "forecast persisted");

    Ok(RunSummary {
        winner: winner.name.to_string(),
        best_mae: winner.metrics.mae,
        scores: scored
            .iter()
            .map(|s| (s.name.to_string(), s.metrics))
            .collect(),
        rows_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::error::TrackingError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scored(name: &'static str, mae: f64) -> ScoredCandidate {
        ScoredCandidate {
            name,
            predictions: vec![0.0],
            metrics: Evaluation {
                mae,
                rmse: mae,
                r2: 0.0,
                sample_count: 1,
            },
        }
    }

    #[test]
    fn selector_takes_the_first_of_tied_minima() {
        let scores = vec![
            scored("Baseline", 10.0),
            scored("Ridge_Regression", 8.5),
            scored("Boosted_Trees_Tuned", 8.5),
            scored("Structural_Hybrid", 9.0),
        ];
        let winner = select_winner(&scores).unwrap();
        assert_eq!(winner.name, "Ridge_Regression");
    }

    #[test]
    fn selector_keeps_the_baseline_when_nothing_beats_it() {
        let scores = vec![scored("Baseline", 7.0), scored("Ridge_Regression", 7.0)];
        assert_eq!(select_winner(&scores).unwrap().name, "Baseline");
    }

    #[test]
    fn selector_of_nothing_is_none() {
        assert!(select_winner(&[]).is_none());
    }

    struct Failing;
    impl Regressor for Failing {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<(), ModelError> {
            Err(ModelError::Library("singular matrix".into()))
        }
        fn predict(&self, _x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::NotFitted)
        }
    }

    struct Constant(f64);
    impl Regressor for Constant {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<(), ModelError> {
            Ok(())
        }
        fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            Ok(vec![self.0; x.len()])
        }
    }

    struct Unreachable(AtomicUsize);
    impl ExperimentTracker for Unreachable {
        fn log_candidate(
            &self,
            _run_name: &str,
            _metrics: &Evaluation,
        ) -> Result<(), TrackingError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(TrackingError::Response("connection refused".into()))
        }
    }

    #[test]
    fn failing_candidates_are_skipped_not_fatal() {
        let candidates = vec![
            Candidate::new("broken", true, Box::new(Failing)),
            Candidate::new("constant", true, Box::new(Constant(5.0))),
        ];
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec![5.0, 5.0];
        let scored = evaluate_candidates(candidates, &x, &y, &x, &y, None);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].name, "constant");
        assert_eq!(scored[0].metrics.mae, 0.0);
    }

    #[test]
    fn tracker_failures_do_not_drop_candidates() {
        let tracker = Unreachable(AtomicUsize::new(0));
        let candidates = vec![
            Candidate::new("untracked", false, Box::new(Constant(1.0))),
            Candidate::new("tracked", true, Box::new(Constant(2.0))),
        ];
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec![1.5, 1.5];
        let scored = evaluate_candidates(candidates, &x, &y, &x, &y, Some(&tracker));
        assert_eq!(scored.len(), 2);
        // Only the tracked candidate touched the collaborator.
        assert_eq!(tracker.0.load(Ordering::SeqCst), 1);
    }
}
