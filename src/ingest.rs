//! Ingestion boundary.
//!
//! Uploaded files arrive as delimited text with a header row. [`read_delimited`]
//! turns them into a [`RawTable`] of strings; [`RawTable::into_columns`] validates the
//! presence of the time column and converts every other column into numeric samples.
//! Malformed input (no time column) is rejected here and never reaches the catalog.
//!
//! Cells that do not parse as numbers become `NaN` samples so that gaps stay
//! aligned with the time axis.

use crate::catalog::SignalColumn;
use crate::error::{AppResult, PlotError};
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;

/// Default delimiter of uploaded files.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Default name of the time axis column.
pub const DEFAULT_TIME_COLUMN: &str = "Time";

/// Header + rows, all cells as strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A validated table: shared time axis plus one column per remaining header.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub time_axis: Arc<[f64]>,
    pub columns: Vec<SignalColumn>,
}

/// Result of handing one file to a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestOutcome {
    /// Names of the signals added to the catalog, in column order.
    pub added_signals: Vec<String>,
    /// True when the upload was refused (e.g. the file was already ingested).
    pub rejected: bool,
    /// User-facing explanation when `rejected` is set.
    pub warning: Option<String>,
}

impl IngestOutcome {
    pub fn rejected(warning: impl Into<String>) -> Self {
        Self {
            added_signals: Vec::new(),
            rejected: true,
            warning: Some(warning.into()),
        }
    }
}

/// Parses delimited text with a header row.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> AppResult<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Validates the time column and converts the table into numeric columns.
    ///
    /// The time column is removed from the returned columns; it becomes the shared
    /// time axis. Short rows yield `NaN` for their missing cells.
    pub fn into_columns(self, source_file: &str, time_column: &str) -> AppResult<IngestedTable> {
        let time_index = self
            .headers
            .iter()
            .position(|h| h == time_column)
            .ok_or_else(|| PlotError::MissingTimeColumn {
                source_file: source_file.to_string(),
                column: time_column.to_string(),
            })?;

        let cell = |row: &Vec<String>, index: usize| -> f64 {
            row.get(index)
                .and_then(|value| value.parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        };

        let time_axis: Arc<[f64]> = self.rows.iter().map(|row| cell(row, time_index)).collect();
        let columns = self
            .headers
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != time_index)
            .map(|(index, name)| {
                SignalColumn::new(
                    name.clone(),
                    self.rows.iter().map(|row| cell(row, index)).collect(),
                )
            })
            .collect();

        Ok(IngestedTable { time_axis, columns })
    }
}
