//! CSV input and output for the pipeline.
//!
//! The input file is the dataset the ingestion stage writes: one row per
//! hour, indexed by a UTC timestamp column. The output file holds the
//! winning forecast next to the actuals and is overwritten in full on each
//! run.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::domain::{EngineeredRow, HourlyRecord, HourlySeries, ResultRecord};
use crate::error::EngineError;

/// Parse a UTC timestamp in either RFC 3339 or the `YYYY-MM-DD HH:MM:SS`
/// form pandas-era exports of this dataset use.
pub fn parse_utc_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| format!("unparseable timestamp '{raw}'"))
}

pub(crate) mod ts_serde {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_utc_timestamp(&raw).map_err(de::Error::custom)
    }
}

/// Read and validate the hourly input series. Any malformed row or
/// unparseable timestamp aborts; renewable columns may be absent entirely
/// and default to zero.
pub fn read_hourly_series(path: &Path) -> Result<HourlySeries, EngineError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| EngineError::DataRead(format!("{}: {e}", path.display())))?;

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<HourlyRecord>().enumerate() {
        let record = row.map_err(|e| {
            EngineError::DataRead(format!("{} row {}: {e}", path.display(), i + 1))
        })?;
        records.push(record);
    }
    if records.is_empty() {
        return Err(EngineError::DataRead(format!(
            "{} contains no data rows",
            path.display()
        )));
    }
    HourlySeries::new(records)
}

/// Write the ingested hourly dataset the engine later consumes.
pub fn write_hourly_series(path: &Path, records: &[HourlyRecord]) -> Result<(), EngineError> {
    ensure_parent_dir(path).map_err(EngineError::Output)?;
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| EngineError::Output(format!("{}: {e}", path.display())))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| EngineError::Output(format!("{}: {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| EngineError::Output(format!("{}: {e}", path.display())))?;
    Ok(())
}

/// Persist the winning forecast for the evaluation window. `predictions`
/// must be aligned 1:1 with `eval_rows`.
pub fn write_results(
    path: &Path,
    eval_rows: &[EngineeredRow],
    predictions: &[f64],
) -> Result<usize, EngineError> {
    if eval_rows.len() != predictions.len() {
        return Err(EngineError::ShapeMismatch {
            actual: eval_rows.len(),
            predicted: predictions.len(),
        });
    }
    ensure_parent_dir(path).map_err(EngineError::Output)?;
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| EngineError::Output(format!("{}: {e}", path.display())))?;
    for (row, forecast) in eval_rows.iter().zip(predictions) {
        let record = ResultRecord {
            timestamp: row.timestamp,
            actual: row.price,
            forecast: *forecast,
            residual_load: row.residual_load,
        };
        writer
            .serialize(&record)
            .map_err(|e| EngineError::Output(format!("{}: {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| EngineError::Output(format!("{}: {e}", path.display())))?;
    Ok(eval_rows.len())
}

/// Read a previously persisted forecast back, e.g. for signal derivation.
pub fn read_results(path: &Path) -> Result<Vec<ResultRecord>, EngineError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| EngineError::DataRead(format!("{}: {e}", path.display())))?;
    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<ResultRecord>().enumerate() {
        records.push(row.map_err(|e| {
            EngineError::DataRead(format!("{} row {}: {e}", path.display(), i + 1))
        })?);
    }
    Ok(records)
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| format!("{}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
