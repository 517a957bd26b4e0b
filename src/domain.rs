//! Core data types for the forecasting pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::ts_serde;
use crate::error::EngineError;

/// One hour of market data for the bidding zone. Renewable components
/// default to zero when the source file omits their columns, mirroring the
/// zero fill the ingestion stage applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    #[serde(rename = "Timestamp_UTC", with = "ts_serde")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Price_EUR")]
    pub price: f64,
    #[serde(rename = "Load_MW")]
    pub load: f64,
    #[serde(rename = "Solar", default)]
    pub solar: f64,
    #[serde(rename = "Wind_Onshore", default)]
    pub wind_onshore: f64,
    #[serde(rename = "Wind_Offshore", default)]
    pub wind_offshore: f64,
}

/// An hourly series with a strictly increasing timestamp index. Gaps are
/// tolerated; duplicates and out-of-order rows are not.
#[derive(Debug, Clone)]
pub struct HourlySeries {
    records: Vec<HourlyRecord>,
}

impl HourlySeries {
    pub fn new(records: Vec<HourlyRecord>) -> Result<Self, EngineError> {
        for pair in records.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(EngineError::DataRead(format!(
                    "timestamps must be strictly increasing: {} followed by {}",
                    pair[0].timestamp, pair[1].timestamp
                )));
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[HourlyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Feature names in the order `EngineeredRow::features` emits them.
pub const FEATURE_NAMES: [&str; 11] = [
    "Load_MW",
    "Solar",
    "Wind_Onshore",
    "Wind_Offshore",
    "Hour",
    "DayOfWeek",
    "Month",
    "IsWeekend",
    "Residual_Load",
    "Price_Lag_24",
    "Price_Lag_168",
];

/// Index of the 168-hour price lag inside the feature vector; the seasonal
/// persistence baseline reads it directly.
pub const PRICE_LAG_168_INDEX: usize = 10;

/// An [`HourlyRecord`] extended with calendar, physical, and lag features.
/// Rows whose lags would reach before the start of the series never get
/// built, so every field here is defined.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredRow {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub load: f64,
    pub solar: f64,
    pub wind_onshore: f64,
    pub wind_offshore: f64,
    pub hour: u32,
    pub day_of_week: u32,
    pub month: u32,
    pub is_weekend: bool,
    pub residual_load: f64,
    pub price_lag_24: f64,
    pub price_lag_168: f64,
}

impl EngineeredRow {
    /// Model inputs, ordered per [`FEATURE_NAMES`]. The target price is
    /// deliberately absent.
    pub fn features(&self) -> Vec<f64> {
        vec![
            self.load,
            self.solar,
            self.wind_onshore,
            self.wind_offshore,
            self.hour as f64,
            self.day_of_week as f64,
            self.month as f64,
            if self.is_weekend { 1.0 } else { 0.0 },
            self.residual_load,
            self.price_lag_24,
            self.price_lag_168,
        ]
    }
}

/// One row of the persisted forecast: the winning candidate's prediction
/// next to the observed price, plus residual load as a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "Timestamp_UTC", with = "ts_serde")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Actual")]
    pub actual: f64,
    #[serde(rename = "Forecast")]
    pub forecast: f64,
    #[serde(rename = "Residual_Load")]
    pub residual_load: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(hour: u32) -> HourlyRecord {
        HourlyRecord {
            timestamp: Utc.with_ymd_and_hms(2023, 1, 1, hour, 0, 0).unwrap(),
            price: 50.0,
            load: 12_000.0,
            solar: 0.0,
            wind_onshore: 0.0,
            wind_offshore: 0.0,
        }
    }

    #[test]
    fn series_accepts_increasing_timestamps() {
        let series = HourlySeries::new(vec![record(0), record(1), record(2)]).unwrap();
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn series_rejects_duplicates() {
        let result = HourlySeries::new(vec![record(0), record(0)]);
        assert!(result.is_err());
    }

    #[test]
    fn series_rejects_out_of_order_rows() {
        let result = HourlySeries::new(vec![record(2), record(1)]);
        assert!(result.is_err());
    }

    #[test]
    fn feature_vector_matches_name_table() {
        let row = EngineeredRow {
            timestamp: Utc.with_ymd_and_hms(2023, 6, 10, 14, 0, 0).unwrap(),
            price: 80.0,
            load: 13_000.0,
            solar: 4_000.0,
            wind_onshore: 1_500.0,
            wind_offshore: 500.0,
            hour: 14,
            day_of_week: 5,
            month: 6,
            is_weekend: true,
            residual_load: 7_000.0,
            price_lag_24: 78.0,
            price_lag_168: 91.0,
        };
        let features = row.features();
        assert_eq!(features.len(), FEATURE_NAMES.len());
        assert_eq!(features[PRICE_LAG_168_INDEX], 91.0);
        assert_eq!(features[7], 1.0);
    }
}
