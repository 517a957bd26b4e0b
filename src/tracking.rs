//! Experiment tracking over the MLflow REST API.
//!
//! The tracker is an optional collaborator: the engine hands it the scored
//! metrics of each trained candidate and otherwise never depends on it.
//! Any failure here is reported as [`TrackingError`] and must be treated
//! as non-fatal by callers.

use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::json;

use crate::config::TrackingConfig;
use crate::error::TrackingError;
use crate::forecast::metrics::Evaluation;

pub trait ExperimentTracker {
    /// Record one candidate's evaluation metrics under `run_name`.
    fn log_candidate(&self, run_name: &str, metrics: &Evaluation) -> Result<(), TrackingError>;
}

/// Tracker that drops everything; used when tracking is disabled.
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn log_candidate(&self, _run_name: &str, _metrics: &Evaluation) -> Result<(), TrackingError> {
        Ok(())
    }
}

pub struct MlflowTracker {
    client: Client,
    base_url: String,
    experiment: String,
}

#[derive(Debug, Deserialize)]
struct ExperimentResponse {
    experiment: Experiment,
}

#[derive(Debug, Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    run: Run,
}

#[derive(Debug, Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

impl MlflowTracker {
    pub fn new(cfg: &TrackingConfig) -> Result<Self, TrackingError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("power-price-forecast/0.2"));
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_seconds))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            experiment: cfg.experiment.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{path}", self.base_url)
    }

    fn experiment_id(&self) -> Result<String, TrackingError> {
        let resp = self
            .client
            .get(self.endpoint("experiments/get-by-name"))
            .query(&[("experiment_name", self.experiment.as_str())])
            .send()?;
        if resp.status().is_success() {
            let parsed: ExperimentResponse = resp
                .json()
                .map_err(|e| TrackingError::Response(e.to_string()))?;
            return Ok(parsed.experiment.experiment_id);
        }
        if resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(rejected(resp));
        }

        let resp = self
            .client
            .post(self.endpoint("experiments/create"))
            .json(&json!({ "name": self.experiment }))
            .send()?;
        if !resp.status().is_success() {
            return Err(rejected(resp));
        }
        let parsed: CreateExperimentResponse = resp
            .json()
            .map_err(|e| TrackingError::Response(e.to_string()))?;
        Ok(parsed.experiment_id)
    }

    fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<String, TrackingError> {
        let resp = self
            .client
            .post(self.endpoint("runs/create"))
            .json(&json!({
                "experiment_id": experiment_id,
                "run_name": run_name,
                "start_time": Utc::now().timestamp_millis(),
            }))
            .send()?;
        if !resp.status().is_success() {
            return Err(rejected(resp));
        }
        let parsed: RunResponse = resp
            .json()
            .map_err(|e| TrackingError::Response(e.to_string()))?;
        Ok(parsed.run.info.run_id)
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<(), TrackingError> {
        let resp = self
            .client
            .post(self.endpoint("runs/log-metric"))
            .json(&json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": Utc::now().timestamp_millis(),
                "step": 0,
            }))
            .send()?;
        if !resp.status().is_success() {
            return Err(rejected(resp));
        }
        Ok(())
    }

    fn finish_run(&self, run_id: &str) -> Result<(), TrackingError> {
        let resp = self
            .client
            .post(self.endpoint("runs/update"))
            .json(&json!({
                "run_id": run_id,
                "status": "FINISHED",
                "end_time": Utc::now().timestamp_millis(),
            }))
            .send()?;
        if !resp.status().is_success() {
            return Err(rejected(resp));
        }
        Ok(())
    }
}

impl ExperimentTracker for MlflowTracker {
    fn log_candidate(&self, run_name: &str, metrics: &Evaluation) -> Result<(), TrackingError> {
        let experiment_id = self.experiment_id()?;
        let run_id = self.create_run(&experiment_id, run_name)?;
        for (key, value) in [
            ("mae", metrics.mae),
            ("rmse", metrics.rmse),
            ("r2", metrics.r2),
        ] {
            self.log_metric(&run_id, key, value)?;
        }
        self.finish_run(&run_id)
    }
}

fn rejected(resp: reqwest::blocking::Response) -> TrackingError {
    let status = resp.status().as_u16();
    let body = resp.text().unwrap_or_default();
    TrackingError::Rejected { status, body }
}
