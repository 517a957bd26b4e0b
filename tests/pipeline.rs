//! End-to-end runs of the experimentation engine against synthetic data.

use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use power_price_forecast::config::{
    BoostingConfig, Config, DataConfig, IngestConfig, ModelsConfig, QaConfig, SearchConfig,
    SignalConfig, SplitConfig, TrackingConfig,
};
use power_price_forecast::data;
use power_price_forecast::domain::HourlyRecord;
use power_price_forecast::error::TrackingError;
use power_price_forecast::forecast::engine::run_experiments;
use power_price_forecast::forecast::metrics::Evaluation;
use power_price_forecast::signal;
use power_price_forecast::tracking::ExperimentTracker;

const SEASONAL_LAG: usize = 168;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
}

fn test_config(dir: &Path, cutoff: DateTime<Utc>) -> Config {
    Config {
        data: DataConfig {
            input_path: dir.join("submission_data.csv"),
            output_path: dir.join("forecast_results.csv"),
        },
        split: SplitConfig { cutoff },
        models: ModelsConfig {
            ridge_alpha: 1e-6,
            search: SearchConfig {
                n_estimators: vec![25],
                learning_rate: vec![0.1],
                max_depth: vec![3],
                iterations: 1,
                cv_folds: 3,
                seed: 42,
            },
            // Deliberately aggressive so the tree stage memorizes training
            // noise and cannot sneak past the plain linear candidate on a
            // linear dataset.
            hybrid: BoostingConfig {
                n_estimators: 50,
                learning_rate: 0.5,
                max_depth: 5,
            },
        },
        tracking: TrackingConfig {
            enabled: false,
            base_url: "http://127.0.0.1:5000".into(),
            experiment: "test".into(),
            http_timeout_seconds: 1,
        },
        ingest: IngestConfig {
            base_url: "https://web-api.tp.entsoe.eu/api".into(),
            area_code: "10YNL----------L".into(),
            period_start: "202301010000".into(),
            period_end: "202401010000".into(),
            http_timeout_seconds: 1,
            security_token: None,
        },
        qa: QaConfig {
            report_path: dir.join("data_qa_report.txt"),
        },
        signal: SignalConfig {
            report_path: dir.join("trading_view.txt"),
            threshold: 0.05,
        },
    }
}

/// Small zero-mean disturbance, decorrelated from every feature.
fn jitter(i: usize) -> f64 {
    (((i * 7919) % 101) as f64 - 50.0) * 1e-3
}

fn linear_record(i: usize) -> HourlyRecord {
    let load = 10_000.0 + ((i * 37) % 1000) as f64;
    HourlyRecord {
        timestamp: start() + Duration::hours(i as i64),
        price: 2.0 * load + jitter(i),
        load,
        solar: 0.0,
        wind_onshore: 0.0,
        wind_offshore: 0.0,
    }
}

#[test]
fn linear_market_is_won_by_the_ridge_candidate() {
    let dir = TempDir::new().unwrap();

    // 768 raw hours -> 600 engineered rows; cutoff after engineered row 300.
    let records: Vec<HourlyRecord> = (0..768).map(linear_record).collect();
    data::write_hourly_series(&dir.path().join("submission_data.csv"), &records).unwrap();

    let cutoff = start() + Duration::hours((SEASONAL_LAG + 299) as i64);
    let cfg = test_config(dir.path(), cutoff);

    let summary = run_experiments(&cfg, None).unwrap();

    assert_eq!(summary.winner, "Ridge_Regression");
    assert!(
        summary.best_mae < 0.5,
        "expected near-zero MAE on a noiseless linear market, got {}",
        summary.best_mae
    );
    assert_eq!(summary.scores.len(), 4, "all four candidates should score");

    // 300 post-cutoff rows minus the 24-row leakage guard.
    assert_eq!(summary.rows_written, 276);
    let results = data::read_results(&cfg.data.output_path).unwrap();
    assert_eq!(results.len(), 276);
    let forecast_metrics = Evaluation::calculate(
        &results.iter().map(|r| r.actual).collect::<Vec<_>>(),
        &results.iter().map(|r| r.forecast).collect::<Vec<_>>(),
    )
    .unwrap();
    assert!((forecast_metrics.mae - summary.best_mae).abs() < 1e-9);
}

#[test]
fn a_two_day_gap_does_not_break_the_run() {
    let dir = TempDir::new().unwrap();

    let records: Vec<HourlyRecord> = (0..616)
        .filter(|i| !(250..298).contains(i))
        .map(linear_record)
        .collect();
    data::write_hourly_series(&dir.path().join("submission_data.csv"), &records).unwrap();

    // Row-based cutoff: engineered rows follow the surviving raw rows.
    let cutoff = records[SEASONAL_LAG + 299].timestamp;
    let cfg = test_config(dir.path(), cutoff);

    let summary = run_experiments(&cfg, None).unwrap();
    assert!(summary.rows_written > 0);
    assert!(cfg.data.output_path.exists());
}

struct FailingTracker;
impl ExperimentTracker for FailingTracker {
    fn log_candidate(&self, _run_name: &str, _metrics: &Evaluation) -> Result<(), TrackingError> {
        Err(TrackingError::Response("tracking backend offline".into()))
    }
}

#[test]
fn an_unreachable_tracker_never_fails_the_run() {
    let dir = TempDir::new().unwrap();

    let records: Vec<HourlyRecord> = (0..568).map(linear_record).collect();
    data::write_hourly_series(&dir.path().join("submission_data.csv"), &records).unwrap();

    let cutoff = start() + Duration::hours((SEASONAL_LAG + 299) as i64);
    let cfg = test_config(dir.path(), cutoff);

    let summary = run_experiments(&cfg, Some(&FailingTracker)).unwrap();
    assert_eq!(summary.scores.len(), 4);
}

#[test]
fn forecast_output_feeds_the_trading_signal() {
    let dir = TempDir::new().unwrap();

    let records: Vec<HourlyRecord> = (0..768).map(linear_record).collect();
    data::write_hourly_series(&dir.path().join("submission_data.csv"), &records).unwrap();

    let cutoff = start() + Duration::hours((SEASONAL_LAG + 299) as i64);
    let cfg = test_config(dir.path(), cutoff);

    run_experiments(&cfg, None).unwrap();
    let signal = signal::run(&cfg).unwrap();

    // Loads cycle through the same band all year, so the final day sits
    // inside the 7-day range.
    assert_eq!(signal.kind, signal::SignalKind::Neutral);
    assert!(cfg.signal.report_path.exists());
}

#[test]
fn cutoff_beyond_the_data_is_insufficient() {
    let dir = TempDir::new().unwrap();

    let records: Vec<HourlyRecord> = (0..568).map(linear_record).collect();
    data::write_hourly_series(&dir.path().join("submission_data.csv"), &records).unwrap();

    let cfg = test_config(dir.path(), start() + Duration::hours(10_000));
    let err = run_experiments(&cfg, None).unwrap_err();
    assert!(err.to_string().contains("evaluation"));
}

#[test]
fn missing_input_file_aborts_before_training() {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(dir.path(), start());
    let err = run_experiments(&cfg, None).unwrap_err();
    assert!(err.to_string().contains("failed to read input data"));
}
