//! Feature engineering for the price models.
//!
//! Derives calendar fields, residual load, and lagged prices from the raw
//! hourly series. Pure: the input series is never mutated and the same
//! input always produces the same rows.

use chrono::{Datelike, Timelike};

use crate::domain::{EngineeredRow, HourlySeries};

/// Number of positions the short price lag looks back.
pub const LAG_SHORT: usize = 24;
/// Number of positions the seasonal price lag looks back.
pub const LAG_SEASONAL: usize = 168;

/// Build the engineered row set. Lags are positional: row `t` carries the
/// price observed 24 and 168 rows earlier in the series, which for a
/// gapless hourly index is exactly one day and one week back. The first
/// `LAG_SEASONAL` rows have no defined lag and are dropped.
pub fn build(series: &HourlySeries) -> Vec<EngineeredRow> {
    let records = series.records();
    records
        .iter()
        .enumerate()
        .filter_map(|(i, rec)| {
            let lag_24 = i.checked_sub(LAG_SHORT).map(|j| records[j].price)?;
            let lag_168 = i.checked_sub(LAG_SEASONAL).map(|j| records[j].price)?;
            let day_of_week = rec.timestamp.weekday().num_days_from_monday();
            Some(EngineeredRow {
                timestamp: rec.timestamp,
                price: rec.price,
                load: rec.load,
                solar: rec.solar,
                wind_onshore: rec.wind_onshore,
                wind_offshore: rec.wind_offshore,
                hour: rec.timestamp.hour(),
                day_of_week,
                month: rec.timestamp.month(),
                is_weekend: day_of_week >= 5,
                residual_load: rec.load - (rec.solar + rec.wind_onshore + rec.wind_offshore),
                price_lag_24: lag_24,
                price_lag_168: lag_168,
            })
        })
        .collect()
}
