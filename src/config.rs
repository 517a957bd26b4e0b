use anyhow::Result;
use chrono::{DateTime, Utc};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub models: ModelsConfig,
    pub tracking: TrackingConfig,
    pub ingest: IngestConfig,
    pub qa: QaConfig,
    pub signal: SignalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitConfig {
    pub cutoff: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub ridge_alpha: f64,
    pub search: SearchConfig,
    pub hybrid: BoostingConfig,
}

/// Randomized-search settings for the tuned tree ensemble. The grid is the
/// cartesian product of the three parameter lists; `iterations` combinations
/// are drawn from it with the fixed `seed`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<u16>,
    pub iterations: usize,
    pub cv_folds: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    pub enabled: bool,
    pub base_url: String,
    pub experiment: String,
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub base_url: String,
    pub area_code: String,
    pub period_start: String,
    pub period_end: String,
    pub http_timeout_seconds: u64,
    /// ENTSO-E security token; normally supplied via PPF__INGEST__SECURITY_TOKEN.
    pub security_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QaConfig {
    pub report_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    pub report_path: PathBuf,
    pub threshold: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("PPF__").split("__"));
        Ok(figment.extract()?)
    }
}
