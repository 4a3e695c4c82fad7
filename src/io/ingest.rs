//! CSV ingest and normalization.
//!
//! Turns a light-curve CSV into a clean `TimeSeries` that is safe to fit.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no fitting logic here
//!
//! Expected columns: `time`, `value` (magnitude or flux), optional `error`.
//! Column lookup is by header name, case-insensitive; `mag`/`flux` are
//! accepted as aliases for `value` and `err`/`sigma` for `error`.

use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::TimeSeries;
use crate::error::FitError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest result: the series plus a record of what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub series: TimeSeries,
    pub skipped: Vec<RowError>,
    pub has_errors_column: bool,
}

/// Read a light-curve CSV file.
pub fn read_light_curve(path: &Path) -> Result<IngestedData, FitError> {
    let file = File::open(path)
        .map_err(|e| FitError::Io(format!("Failed to open '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| FitError::Io(format!("Failed to read CSV header: {e}")))?
        .clone();

    let time_col = find_column(&headers, &["time", "t", "jd", "bjd", "hjd"]).ok_or_else(|| {
        FitError::Io(format!(
            "'{}' has no time column (expected one of: time, t, jd, bjd, hjd)",
            path.display()
        ))
    })?;
    let value_col =
        find_column(&headers, &["value", "mag", "flux", "y"]).ok_or_else(|| {
            FitError::Io(format!(
                "'{}' has no value column (expected one of: value, mag, flux, y)",
                path.display()
            ))
        })?;
    let error_col = find_column(&headers, &["error", "err", "sigma", "mag_err", "flux_err"]);

    let mut times = Vec::new();
    let mut values = Vec::new();
    let mut sigmas = Vec::new();
    let mut skipped = Vec::new();

    for (i, record) in reader.records().enumerate() {
        // Header is line 1; data starts at line 2.
        let line = i + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                skipped.push(RowError {
                    line,
                    message: format!("unreadable row: {e}"),
                });
                continue;
            }
        };

        let Some(t) = parse_field(&record, time_col) else {
            skipped.push(RowError {
                line,
                message: "missing or non-numeric time".into(),
            });
            continue;
        };
        let Some(v) = parse_field(&record, value_col) else {
            skipped.push(RowError {
                line,
                message: "missing or non-numeric value".into(),
            });
            continue;
        };
        let sigma = error_col.and_then(|c| parse_field(&record, c));
        if let Some(s) = sigma {
            if s <= 0.0 {
                skipped.push(RowError {
                    line,
                    message: format!("non-positive uncertainty {s}"),
                });
                continue;
            }
        } else if error_col.is_some() {
            skipped.push(RowError {
                line,
                message: "missing or non-numeric uncertainty".into(),
            });
            continue;
        }

        times.push(t);
        values.push(v);
        if let Some(s) = sigma {
            sigmas.push(s);
        }
    }

    if times.is_empty() {
        return Err(FitError::Io(format!(
            "'{}' contains no usable rows ({} skipped)",
            path.display(),
            skipped.len()
        )));
    }

    let has_errors_column = error_col.is_some();
    let series = TimeSeries::new(times, values, has_errors_column.then_some(sigmas))?;
    Ok(IngestedData {
        series,
        skipped,
        has_errors_column,
    })
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

fn parse_field(record: &StringRecord, col: usize) -> Option<f64> {
    let raw = record.get(col)?;
    let v: f64 = raw.parse().ok()?;
    v.is_finite().then_some(v)
}
