use anyhow::Result;
use power_price_forecast::config::Config;
use power_price_forecast::ingest;
use power_price_forecast::telemetry::init_tracing;
use tracing::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let summary = ingest::run(&cfg)?;
    info!(
        rows = summary.rows,
        with_generation = summary.with_generation,
        "ingestion complete"
    );
    Ok(())
}
