//! Error taxonomy for the forecasting engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the model layer (fitting and prediction).
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("empty feature matrix")]
    EmptyMatrix,

    #[error("feature row {row} has {got} columns, expected {expected}")]
    RaggedFeatures {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("feature and target count mismatch: {features} rows, {targets} targets")]
    TargetMismatch { features: usize, targets: usize },

    #[error("hyperparameter grid is empty")]
    EmptyGrid,

    #[error("{0}")]
    Library(String),
}

/// Errors raised by the experimentation engine. Variants marked fatal abort
/// the run; `CandidateFit` and `ShapeMismatch` only disqualify one candidate.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read input data: {0}")]
    DataRead(String),

    #[error("chronological split left the {side} window empty (cutoff {cutoff})")]
    InsufficientData {
        side: &'static str,
        cutoff: DateTime<Utc>,
    },

    #[error("candidate '{name}' failed: {source}")]
    CandidateFit { name: String, source: ModelError },

    #[error("actual and predicted lengths differ: {actual} vs {predicted}")]
    ShapeMismatch { actual: usize, predicted: usize },

    #[error("no candidate produced a usable forecast")]
    NoViableCandidate,

    #[error("failed to write results: {0}")]
    Output(String),
}

/// Errors from the experiment-tracking collaborator. Never fatal: the engine
/// logs these and keeps going.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("tracking request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("tracking server rejected request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected tracking response: {0}")]
    Response(String),
}
