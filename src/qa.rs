//! Data quality checks over the ingested dataset.
//!
//! Read-only: the report flags problems for a human, it never repairs the
//! file or blocks the forecasting run.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::data;

/// Hours in a non-leap year; the ingestion window covers one calendar year.
const EXPECTED_HOURS: i64 = 8760;
/// Completeness tolerance, one day either way.
const COMPLETENESS_SLACK: i64 = 24;

#[derive(Debug)]
pub struct QaCheck {
    pub label: &'static str,
    pub passed: bool,
    pub detail: Option<String>,
}

impl QaCheck {
    fn pass(label: &'static str) -> Self {
        Self {
            label,
            passed: true,
            detail: None,
        }
    }

    fn fail(label: &'static str, detail: String) -> Self {
        Self {
            label,
            passed: false,
            detail: Some(detail),
        }
    }
}

#[derive(Debug)]
pub struct QaOutcome {
    pub checks: Vec<QaCheck>,
}

impl QaOutcome {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

/// Run all checks against the configured input file and write the report.
pub fn run(cfg: &Config) -> Result<QaOutcome> {
    let path = &cfg.data.input_path;
    let outcome = inspect(path)?;

    let report = render_report(path, &outcome);
    if let Some(parent) = cfg.qa.report_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(&cfg.qa.report_path, &report)
        .with_context(|| format!("writing {}", cfg.qa.report_path.display()))?;

    for check in &outcome.checks {
        if check.passed {
            info!(check = check.label, "PASS");
        } else {
            warn!(check = check.label, detail = check.detail.as_deref().unwrap_or(""), "FAIL");
        }
    }
    info!(path = %cfg.qa.report_path.display(), "QA report written");
    Ok(outcome)
}

/// Tolerant scan of the raw CSV: rows the strict loader would reject are
/// counted as findings instead of aborting.
pub fn inspect(path: &Path) -> Result<QaOutcome> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let headers = reader.headers().context("reading CSV header")?.clone();
    let load_column = headers.iter().position(|h| h == "Load_MW");

    let mut rows: i64 = 0;
    let mut missing: u64 = 0;
    let mut duplicates: u64 = 0;
    let mut negative_load: u64 = 0;
    let mut seen = HashSet::new();

    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        rows += 1;
        for (i, cell) in record.iter().enumerate() {
            if i == 0 {
                match data::parse_utc_timestamp(cell) {
                    Ok(ts) => {
                        if !seen.insert(ts) {
                            duplicates += 1;
                        }
                    }
                    Err(_) => missing += 1,
                }
            } else if cell.trim().is_empty() || cell.trim().parse::<f64>().map_or(true, f64::is_nan)
            {
                missing += 1;
            }
        }
        if let Some(col) = load_column {
            if let Some(Ok(load)) = record.get(col).map(|c| c.trim().parse::<f64>()) {
                if load <= 0.0 {
                    negative_load += 1;
                }
            }
        }
    }

    let mut checks = vec![
        if missing == 0 {
            QaCheck::pass("Missing Values")
        } else {
            QaCheck::fail("Missing Values", format!("{missing}"))
        },
        if duplicates == 0 {
            QaCheck::pass("Duplicates")
        } else {
            QaCheck::fail("Duplicates", format!("{duplicates}"))
        },
    ];
    if load_column.is_some() {
        checks.push(if negative_load == 0 {
            QaCheck::pass("Negative Load")
        } else {
            QaCheck::fail("Negative Load", format!("{negative_load}"))
        });
    }
    let gap = EXPECTED_HOURS - rows;
    checks.push(if gap.abs() < COMPLETENESS_SLACK {
        QaCheck::pass("Completeness")
    } else {
        QaCheck::fail("Completeness", format!("{gap} missing"))
    });

    Ok(QaOutcome { checks })
}

pub fn render_report(input_path: &Path, outcome: &QaOutcome) -> String {
    let mut lines = vec![
        format!("DATA QA REPORT for {}", input_path.display()),
        "=".repeat(40),
    ];
    for (i, check) in outcome.checks.iter().enumerate() {
        let verdict = match (&check.passed, &check.detail) {
            (true, _) => "PASS".to_string(),
            (false, Some(detail)) => format!("FAIL ({detail})"),
            (false, None) => "FAIL".to_string(),
        };
        lines.push(format!("{}. {:<16} {verdict}", i + 1, format!("{}:", check.label)));
    }
    lines.join("\n")
}
