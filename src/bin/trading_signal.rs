use anyhow::Result;
use power_price_forecast::config::Config;
use power_price_forecast::signal;
use power_price_forecast::telemetry::init_tracing;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let signal = signal::run(&cfg)?;
    println!("{}", signal::render_report(&signal));
    Ok(())
}
