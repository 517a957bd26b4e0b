//! ENTSO-E transparency platform client and market-document parsing.

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, TimeZone, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;

use crate::config::IngestConfig;

/// Market document types the pipeline requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    /// A44: day-ahead prices
    DayAheadPrices,
    /// A65: system total load
    TotalLoad,
    /// A69: wind and solar generation forecast
    GenerationForecast,
}

impl DocumentType {
    pub fn code(self) -> &'static str {
        match self {
            DocumentType::DayAheadPrices => "A44",
            DocumentType::TotalLoad => "A65",
            DocumentType::GenerationForecast => "A69",
        }
    }

    /// Element holding the numeric observation inside each `Point`.
    pub fn value_tag(self) -> &'static str {
        match self {
            DocumentType::DayAheadPrices => "price.amount",
            DocumentType::TotalLoad | DocumentType::GenerationForecast => "quantity",
        }
    }
}

/// One expanded observation from a market document.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// PSR type code (e.g. B16 solar); "General" when the series has none.
    pub psr_type: String,
}

pub struct EntsoeClient {
    client: Client,
    base_url: String,
    area_code: String,
    period_start: String,
    period_end: String,
    token: String,
}

impl EntsoeClient {
    pub fn new(cfg: &IngestConfig, token: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("power-price-forecast/0.2"));
        let client = Client::builder()
            .timeout(StdDuration::from_secs(cfg.http_timeout_seconds))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            area_code: cfg.area_code.clone(),
            period_start: cfg.period_start.clone(),
            period_end: cfg.period_end.clone(),
            token,
        })
    }

    /// Fetch one document. `Ok(None)` means the platform answered but holds
    /// no data for the query.
    pub fn fetch_document(&self, doc: DocumentType) -> Result<Option<String>> {
        let mut params: Vec<(&str, &str)> = vec![
            ("securityToken", self.token.as_str()),
            ("documentType", doc.code()),
            ("periodStart", self.period_start.as_str()),
            ("periodEnd", self.period_end.as_str()),
        ];
        match doc {
            DocumentType::DayAheadPrices => {
                params.push(("in_Domain", self.area_code.as_str()));
                params.push(("out_Domain", self.area_code.as_str()));
                params.push(("contract_MarketAgreement.Type", "A01"));
            }
            DocumentType::TotalLoad => {
                params.push(("outBiddingZone_Domain", self.area_code.as_str()));
                params.push(("processType", "A01"));
            }
            DocumentType::GenerationForecast => {
                params.push(("in_Domain", self.area_code.as_str()));
                params.push(("processType", "A01"));
            }
        }

        let resp = self
            .client
            .get(self.base_url.as_str())
            .query(&params)
            .send()
            .with_context(|| format!("{} GET failed", doc.code()))?;
        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("{} body read failed", doc.code()))?;
        if !status.is_success() {
            bail!("ENTSO-E API error for {}: HTTP {status}", doc.code());
        }
        if body.contains("No matching data") {
            return Ok(None);
        }
        info!(document = doc.code(), kilobytes = body.len() / 1024, "document fetched");
        Ok(Some(body))
    }
}

/// Expand every `TimeSeries/Period/Point` of a market document into
/// timestamped observations. Namespaces are ignored; unknown elements are
/// skipped.
pub fn parse_market_document(xml: &str, value_tag: &str) -> Result<Vec<SeriesPoint>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut points = Vec::new();
    let mut psr_type = String::from("General");
    let mut period_start: Option<DateTime<Utc>> = None;
    let mut resolution_minutes: i64 = 60;
    let mut position: Option<i64> = None;
    let mut value: Option<f64> = None;

    loop {
        match reader.read_event() {
            Err(e) => bail!("malformed market document: {e}"),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "TimeSeries" => {
                        psr_type = String::from("General");
                        period_start = None;
                    }
                    "Period" => {
                        period_start = None;
                        resolution_minutes = 60;
                    }
                    "Point" => {
                        position = None;
                        value = None;
                    }
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::End(_)) => {
                if path.last().map(String::as_str) == Some("Point") {
                    if let (Some(pos), Some(val), Some(start)) = (position, value, period_start) {
                        points.push(SeriesPoint {
                            timestamp: start + Duration::minutes((pos - 1) * resolution_minutes),
                            value: val,
                            psr_type: psr_type.clone(),
                        });
                    }
                }
                path.pop();
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| anyhow::anyhow!("malformed market document: {e}"))?;
                let text = text.trim();
                let Some(leaf) = path.last() else { continue };
                let in_period = path.iter().any(|p| p == "Period");
                match leaf.as_str() {
                    "psrType" => psr_type = text.to_string(),
                    "start" if in_period => period_start = Some(parse_period_start(text)?),
                    "resolution" if in_period => {
                        resolution_minutes = if text == "PT15M" { 15 } else { 60 };
                    }
                    "position" => position = text.parse().ok(),
                    other if other == value_tag => value = text.parse().ok(),
                    _ => {}
                }
            }
            Ok(_) => {}
        }
    }
    Ok(points)
}

/// ENTSO-E writes interval bounds as `2023-01-01T00:00Z`; accept full
/// RFC 3339 too.
fn parse_period_start(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("unparseable period start '{raw}'"))
}

/// Average observations into hourly buckets, keyed by the truncated hour.
pub fn hourly_mean(points: impl IntoIterator<Item = (DateTime<Utc>, f64)>) -> BTreeMap<DateTime<Utc>, f64> {
    let mut buckets: BTreeMap<DateTime<Utc>, (f64, u32)> = BTreeMap::new();
    for (ts, value) in points {
        let hour = ts.duration_trunc(Duration::hours(1)).unwrap_or(ts);
        let entry = buckets.entry(hour).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(ts, (sum, count))| (ts, sum / count as f64))
        .collect()
}
