//! Bulk loading of session events from delimited files
//!
//! Every field arrives as text and is coerced explicitly. Malformed numbers
//! and booleans abort the load; malformed dates become `NULL` and the row is
//! kept.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use super::Database;
use crate::error::{Error, Result};
use crate::types::{SessionEvent, EVENT_COLUMNS};

/// Primary date format of the input file
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Fallback accepted when the primary format does not match
const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Options for reading a delimited source.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Field delimiter byte
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// One input record before coercion.
#[derive(Debug, Deserialize)]
struct RawEvent {
    user_id: String,
    session_id: String,
    page_views: String,
    time_on_page: String,
    events_triggered: String,
    category: String,
    is_returning: String,
    converted: String,
    revenue: String,
    session_date: String,
}

/// Outcome of reading a source file, before insertion.
#[derive(Debug, Default)]
pub struct ParsedEvents {
    /// Coerced rows in file order
    pub events: Vec<SessionEvent>,
    /// Rows whose date could not be parsed (stored as NULL)
    pub null_dates: usize,
}

impl Database {
    /// Load a comma-delimited file into the event table.
    ///
    /// Returns the number of rows in the table after loading.
    pub fn load_csv(&self, path: &Path) -> Result<usize> {
        self.load_csv_with(path, &LoadOptions::default())
    }

    /// Load a delimited file into the event table using explicit options.
    pub fn load_csv_with(&self, path: &Path, options: &LoadOptions) -> Result<usize> {
        if !self.is_initialized()? {
            return Err(Error::Load(
                "user_events table is not initialized; call create_schema first".to_string(),
            ));
        }

        let parsed = read_events(path, options)?;
        if parsed.null_dates > 0 {
            tracing::warn!(
                path = %path.display(),
                null_dates = parsed.null_dates,
                "Unparseable session dates stored as NULL"
            );
        }

        let count = self.insert_events(&parsed.events)?;
        tracing::info!(
            path = %path.display(),
            rows = parsed.events.len(),
            total = count,
            "Loaded events from file"
        );
        Ok(count)
    }
}

/// Read and coerce every record of a delimited file.
pub fn read_events(path: &Path, options: &LoadOptions) -> Result<ParsedEvents> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::Load(format!("cannot read {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| Error::Load(format!("cannot read header of {}: {}", path.display(), e)))?
        .clone();

    let missing: Vec<&str> = EVENT_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Load(format!(
            "{} is missing columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut parsed = ParsedEvents::default();
    for result in reader.records() {
        let record = result.map_err(|e| Error::Load(format!("{}: {}", path.display(), e)))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw: RawEvent = record
            .deserialize(Some(&headers))
            .map_err(|e| Error::Load(format!("line {}: {}", line, e)))?;

        let (event, date_ok) = coerce(raw, line)?;
        if !date_ok {
            parsed.null_dates += 1;
        }
        parsed.events.push(event);
    }

    Ok(parsed)
}

/// Coerce a raw record. The flag is false when the date fell back to NULL.
fn coerce(raw: RawEvent, line: u64) -> Result<(SessionEvent, bool)> {
    let session_date = parse_date(&raw.session_date);
    let date_ok = session_date.is_some();

    let event = SessionEvent {
        page_views: parse_int("page_views", &raw.page_views, line)?,
        time_on_page: parse_int("time_on_page", &raw.time_on_page, line)?,
        events_triggered: parse_int("events_triggered", &raw.events_triggered, line)?,
        is_returning: parse_bool("is_returning", &raw.is_returning, line)?,
        converted: parse_bool("converted", &raw.converted, line)?,
        revenue: parse_revenue(&raw.revenue, line)?,
        user_id: raw.user_id,
        session_id: raw.session_id,
        category: raw.category,
        session_date,
    };

    event
        .validate()
        .map_err(|msg| Error::Load(format!("line {}: {}", line, msg)))?;

    Ok((event, date_ok))
}

/// Parse an integer field; integral decimals such as `"3.0"` are accepted.
pub(crate) fn parse_int(column: &str, value: &str, line: u64) -> Result<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Ok(n);
    }
    match value.parse::<f64>() {
        // i64::MAX as f64 rounds up to 2^63, hence the exclusive bound
        Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(Error::Load(format!(
            "line {}: column {}: expected integer, got {:?}",
            line, column, value
        ))),
    }
}

/// Parse a boolean from common truthy/falsy text and integer encodings.
pub(crate) fn parse_bool(column: &str, value: &str, line: u64) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Ok(true),
        "0" | "false" | "f" | "no" | "n" => Ok(false),
        _ => Err(Error::Load(format!(
            "line {}: column {}: expected boolean, got {:?}",
            line, column, value
        ))),
    }
}

pub(crate) fn parse_revenue(value: &str, line: u64) -> Result<f64> {
    if value.is_empty() {
        return Ok(0.0);
    }
    value.parse::<f64>().map_err(|_| {
        Error::Load(format!(
            "line {}: column revenue: expected decimal, got {:?}",
            line, value
        ))
    })
}

/// Parse a session date, returning `None` instead of failing.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, FALLBACK_DATE_FORMAT))
        .ok()
}
