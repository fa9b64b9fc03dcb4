//! Rendering of report tables as aligned text, JSON or CSV.

use anyhow::{Context, Result};
use serde::Serialize;
use sessionlens_core::{QueryResult, SummaryStats};
use std::io::Write;

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
    Csv,
}

/// A rendered report: header plus string cells in column order.
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Structured form used for JSON output
    pub json: serde_json::Value,
}

impl Table {
    /// Build a table from serializable rows, keeping struct field order.
    ///
    /// Rows are written through a CSV serializer and read back, so column
    /// names and cell formatting match the CSV output exactly.
    pub fn from_rows<T: Serialize>(title: &str, rows: &[T]) -> Result<Self> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for row in rows {
            wtr.serialize(row)?;
        }
        let bytes = wtr.into_inner().context("failed to flush table")?;

        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let headers = if rows.is_empty() {
            Vec::new()
        } else {
            rdr.headers()?.iter().map(str::to_string).collect()
        };
        let cells = rdr
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;

        Ok(Self {
            title: title.to_string(),
            headers,
            rows: cells,
            json: serde_json::to_value(rows)?,
        })
    }

    /// Single-row table for the global summary.
    pub fn from_summary(stats: &SummaryStats) -> Result<Self> {
        Self::from_rows("Summary", std::slice::from_ref(stats))
    }

    /// Table for an ad-hoc query result.
    pub fn from_query(result: &QueryResult) -> Self {
        let rows = result
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        Self {
            title: "Query".to_string(),
            headers: result.columns.clone(),
            rows,
            json: serde_json::Value::Array(
                result
                    .records()
                    .into_iter()
                    .map(serde_json::Value::Object)
                    .collect(),
            ),
        }
    }

    fn key(&self) -> String {
        self.title.to_lowercase().replace(' ', "_")
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write one or more tables to `out` in the requested format.
pub fn render(out: &mut impl Write, tables: &[Table], format: Format) -> Result<()> {
    match format {
        Format::Text => {
            for (i, table) in tables.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                write_text(out, table)?;
            }
        }
        Format::Json => {
            let value = match tables {
                [single] => single.json.clone(),
                _ => serde_json::Value::Object(
                    tables.iter().map(|t| (t.key(), t.json.clone())).collect(),
                ),
            };
            serde_json::to_writer_pretty(&mut *out, &value)?;
            writeln!(out)?;
        }
        Format::Csv => {
            for (i, table) in tables.iter().enumerate() {
                if tables.len() > 1 {
                    if i > 0 {
                        writeln!(out)?;
                    }
                    writeln!(out, "# {}", table.title)?;
                }
                write_csv(out, table)?;
            }
        }
    }
    Ok(())
}

fn write_text(out: &mut impl Write, table: &Table) -> Result<()> {
    writeln!(out, "{}", table.title)?;
    writeln!(out, "{}", "=".repeat(table.title.len()))?;

    if table.rows.is_empty() {
        writeln!(out, "  (no rows)")?;
        return Ok(());
    }

    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.len()).collect();
    for row in &table.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(&table.headers))?;
    writeln!(
        out,
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    )?;
    for row in &table.rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}

fn write_csv(out: &mut impl Write, table: &Table) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    if !table.headers.is_empty() {
        wtr.write_record(&table.headers)?;
    }
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
