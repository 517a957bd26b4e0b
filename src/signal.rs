//! Mean-reversion trading view over the persisted forecast.
//!
//! Compares the final day's forecast against the mean actual price of the
//! seven days before it. A forecast outside the threshold band produces a
//! directional signal; anything inside stays neutral.

use std::fmt;
use std::fs;

use anyhow::{ensure, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::Config;
use crate::data;
use crate::domain::ResultRecord;

/// Hours treated as "tomorrow": the final day of the forecast window.
const FORECAST_WINDOW: usize = 24;
/// Hours of actuals forming the rolling baseline.
const BASELINE_WINDOW: usize = 168;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Long,
    Short,
    Neutral,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Long => write!(f, "LONG (BUY)"),
            SignalKind::Short => write!(f, "SHORT (SELL)"),
            SignalKind::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TradingSignal {
    pub kind: SignalKind,
    pub target_date: NaiveDate,
    pub forecast_mean: f64,
    pub baseline_mean: f64,
    /// Relative deviation of the forecast from the baseline, signed.
    pub deviation: f64,
}

/// Derive the signal from persisted result records. Needs at least one
/// baseline hour beyond the forecast day; a baseline shorter than seven
/// days is used as-is with a warning.
pub fn derive(records: &[ResultRecord], threshold: f64) -> Result<TradingSignal> {
    ensure!(
        records.len() > FORECAST_WINDOW,
        "need more than {FORECAST_WINDOW} result rows for a signal, got {}",
        records.len()
    );

    let tomorrow = &records[records.len() - FORECAST_WINDOW..];
    let history_start = records
        .len()
        .saturating_sub(FORECAST_WINDOW + BASELINE_WINDOW);
    let history = &records[history_start..records.len() - FORECAST_WINDOW];
    if history.len() < BASELINE_WINDOW {
        warn!(
            hours = history.len(),
            "baseline shorter than seven days, using available history"
        );
    }

    let forecast_mean = mean(tomorrow.iter().map(|r| r.forecast));
    let baseline_mean = mean(history.iter().map(|r| r.actual));
    let deviation = forecast_mean / baseline_mean - 1.0;

    let kind = if deviation < -threshold {
        SignalKind::Long
    } else if deviation > threshold {
        SignalKind::Short
    } else {
        SignalKind::Neutral
    };

    Ok(TradingSignal {
        kind,
        target_date: tomorrow[0].timestamp.date_naive(),
        forecast_mean,
        baseline_mean,
        deviation,
    })
}

pub fn render_report(signal: &TradingSignal) -> String {
    let reason = match signal.kind {
        SignalKind::Long => format!(
            "Forecast is {:.1}% cheaper than the 7-day average.",
            -signal.deviation * 100.0
        ),
        SignalKind::Short => format!(
            "Forecast is {:.1}% more expensive than the 7-day average.",
            signal.deviation * 100.0
        ),
        SignalKind::Neutral => "Price is within the normal 7-day range.".to_string(),
    };
    [
        "TRADING SIGNAL REPORT".to_string(),
        "=".repeat(40),
        format!("Target Date:       {}", signal.target_date),
        "Strategy:          Mean Reversion (vs 7-Day Rolling Avg)".to_string(),
        "-".repeat(40),
        format!("Signal:            {}", signal.kind),
        format!("Reason:            {reason}"),
        "-".repeat(40),
        format!("Forecast Price:    EUR {:.2}", signal.forecast_mean),
        format!("7-Day Baseline:    EUR {:.2}", signal.baseline_mean),
        "=".repeat(40),
        String::new(),
        "Invalidation Logic:".to_string(),
        "Discard signal if real-time interconnector capacity drops >500MW".to_string(),
        "after 10:00 UTC, as this changes the fundamental supply curve.".to_string(),
    ]
    .join("\n")
}

/// Load the forecast file, derive the signal, and write the report.
pub fn run(cfg: &Config) -> Result<TradingSignal> {
    let records = data::read_results(&cfg.data.output_path)?;
    let signal = derive(&records, cfg.signal.threshold)?;

    let report = render_report(&signal);
    if let Some(parent) = cfg.signal.report_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(&cfg.signal.report_path, &report)
        .with_context(|| format!("writing {}", cfg.signal.report_path.display()))?;

    info!(
        signal = %signal.kind,
        target_date = %signal.target_date,
        forecast = signal.forecast_mean,
        baseline = signal.baseline_mean,
        "trading signal derived"
    );
    Ok(signal)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    sum / count as f64
}
