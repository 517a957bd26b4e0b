use anyhow::Result;
use power_price_forecast::config::Config;
use power_price_forecast::qa;
use power_price_forecast::telemetry::init_tracing;
use tracing::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let outcome = qa::run(&cfg)?;
    info!(all_passed = outcome.all_passed(), "QA complete");
    Ok(())
}
