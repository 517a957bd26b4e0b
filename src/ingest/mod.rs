//! Dataset ingestion: ENTSO-E market documents to the hourly input CSV.
//!
//! Prices and load are mandatory; the generation forecast degrades to zero
//! renewables when the platform has nothing for the query, so the engine's
//! residual load falls back to plain load.

pub mod entsoe;

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::data;
use crate::domain::HourlyRecord;

pub use entsoe::{DocumentType, EntsoeClient};

#[derive(Debug)]
pub struct IngestSummary {
    pub rows: usize,
    pub with_generation: bool,
}

pub fn run(cfg: &Config) -> Result<IngestSummary> {
    let token = cfg
        .ingest
        .security_token
        .clone()
        .context("ENTSO-E security token not configured (set PPF__INGEST__SECURITY_TOKEN)")?;
    let client = EntsoeClient::new(&cfg.ingest, token)?;

    let prices = fetch_hourly(&client, DocumentType::DayAheadPrices)?
        .context("day-ahead price document contained no data")?;
    let loads = fetch_hourly(&client, DocumentType::TotalLoad)?
        .context("total load document contained no data")?;

    let generation = match client.fetch_document(DocumentType::GenerationForecast) {
        Ok(Some(xml)) => entsoe::parse_market_document(&xml, DocumentType::GenerationForecast.value_tag())?,
        Ok(None) => {
            warn!("no generation forecast available, writing zero renewables");
            Vec::new()
        }
        Err(err) => {
            warn!(error = %err, "generation fetch failed, writing zero renewables");
            Vec::new()
        }
    };
    let solar = generation_by_psr(&generation, "B16");
    let wind_offshore = generation_by_psr(&generation, "B18");
    let wind_onshore = generation_by_psr(&generation, "B19");

    let mut records = Vec::with_capacity(prices.len());
    for (timestamp, price) in &prices {
        let Some(load) = loads.get(timestamp) else {
            continue; // inner join on price and load
        };
        records.push(HourlyRecord {
            timestamp: *timestamp,
            price: *price,
            load: *load,
            solar: lookup(&solar, timestamp),
            wind_onshore: lookup(&wind_onshore, timestamp),
            wind_offshore: lookup(&wind_offshore, timestamp),
        });
    }
    if records.is_empty() {
        bail!("price and load documents share no timestamps");
    }

    data::write_hourly_series(&cfg.data.input_path, &records)?;
    info!(
        path = %cfg.data.input_path.display(),
        rows = records.len(),
        "ingested dataset written"
    );
    Ok(IngestSummary {
        rows: records.len(),
        with_generation: !generation.is_empty(),
    })
}

fn fetch_hourly(
    client: &EntsoeClient,
    doc: DocumentType,
) -> Result<Option<BTreeMap<DateTime<Utc>, f64>>> {
    let Some(xml) = client.fetch_document(doc)? else {
        return Ok(None);
    };
    let points = entsoe::parse_market_document(&xml, doc.value_tag())?;
    if points.is_empty() {
        return Ok(None);
    }
    Ok(Some(entsoe::hourly_mean(
        points.into_iter().map(|p| (p.timestamp, p.value)),
    )))
}

fn generation_by_psr(
    points: &[entsoe::SeriesPoint],
    psr_code: &str,
) -> BTreeMap<DateTime<Utc>, f64> {
    entsoe::hourly_mean(
        points
            .iter()
            .filter(|p| p.psr_type == psr_code)
            .map(|p| (p.timestamp, p.value)),
    )
}

fn lookup(map: &BTreeMap<DateTime<Utc>, f64>, timestamp: &DateTime<Utc>) -> f64 {
    map.get(timestamp).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(hour: u32, value: f64, psr: &str) -> entsoe::SeriesPoint {
        entsoe::SeriesPoint {
            timestamp: Utc.with_ymd_and_hms(2023, 3, 5, hour, 0, 0).unwrap(),
            value,
            psr_type: psr.to_string(),
        }
    }

    #[test]
    fn generation_is_split_by_psr_code() {
        let points = vec![
            point(10, 500.0, "B16"),
            point(10, 1200.0, "B19"),
            point(11, 600.0, "B16"),
            point(10, 80.0, "B01"), // biomass, not a tracked renewable
        ];
        let solar = generation_by_psr(&points, "B16");
        assert_eq!(solar.len(), 2);
        assert_eq!(
            lookup(&solar, &Utc.with_ymd_and_hms(2023, 3, 5, 10, 0, 0).unwrap()),
            500.0
        );
        assert_eq!(
            lookup(&solar, &Utc.with_ymd_and_hms(2023, 3, 5, 12, 0, 0).unwrap()),
            0.0
        );
    }
}
