use anyhow::Result;
use power_price_forecast::config::Config;
use power_price_forecast::forecast::engine;
use power_price_forecast::telemetry::init_tracing;
use power_price_forecast::tracking::{ExperimentTracker, MlflowTracker};
use tracing::{info, warn};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    let tracker = if cfg.tracking.enabled {
        match MlflowTracker::new(&cfg.tracking) {
            Ok(tracker) => Some(tracker),
            Err(err) => {
                warn!(error = %err, "experiment tracking unavailable, running without it");
                None
            }
        }
    } else {
        None
    };

    let summary = engine::run_experiments(
        &cfg,
        tracker.as_ref().map(|t| t as &dyn ExperimentTracker),
    )?;

    info!(
        winner = %summary.winner,
        mae = summary.best_mae,
        rows = summary.rows_written,
        "forecast run complete"
    );
    Ok(())
}
