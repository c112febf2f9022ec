//! Tables keyed by calendar date, such as reported case counts.
//!
//! The date column must hold ISO-8601 calendar dates (`YYYY-MM-DD`).
//! Ordinal day numbers, decimal years or free text in that column are a
//! [`PhylopostError::Validation`] error rather than something to coerce.

use std::path::Path;

use chrono::NaiveDate;
use phylopost_core::{PhylopostError, Result};

use crate::table::{header, parse_value, read_source, reader_for};

/// Rows keyed by a calendar date, with the remaining columns numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedTable {
    pub dates: Vec<NaiveDate>,
    /// Names of the numeric columns (the date column excluded).
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl DatedTable {
    /// All values of numeric column `name`, or `None` if absent.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }
}

/// Read a dated table from `path`, with dates in column `date_column`.
pub fn read_dated_table(path: impl AsRef<Path>, date_column: &str) -> Result<DatedTable> {
    let path = path.as_ref();
    let text = read_source(path)?;
    parse_dated_table(&text, date_column).map_err(|e| e.context(path.display()))
}

/// Parse a dated table from in-memory text.
pub fn parse_dated_table(text: &str, date_column: &str) -> Result<DatedTable> {
    let mut reader = reader_for(text);
    let all_columns = header(&mut reader)?;
    let date_idx = all_columns
        .iter()
        .position(|c| c == date_column)
        .ok_or_else(|| PhylopostError::Parse(format!("missing date column '{}'", date_column)))?;
    let columns: Vec<String> = all_columns
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != date_idx)
        .map(|(_, c)| c.clone())
        .collect();

    let mut dates = Vec::new();
    let mut rows = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let record = result.map_err(|e| PhylopostError::Parse(e.to_string()))?;
        let row_num = row_num + 1;

        let field = record.get(date_idx).unwrap_or("");
        let date = NaiveDate::parse_from_str(field, "%Y-%m-%d").map_err(|_| {
            PhylopostError::Validation(format!(
                "row {}: column '{}' must hold calendar dates (YYYY-MM-DD), found '{}'",
                row_num, date_column, field
            ))
        })?;

        let mut row = Vec::with_capacity(columns.len());
        for (i, field) in record.iter().enumerate() {
            if i == date_idx {
                continue;
            }
            let value = parse_value(field).ok_or_else(|| {
                PhylopostError::Parse(format!(
                    "row {}: column '{}': invalid number '{}'",
                    row_num, all_columns[i], field
                ))
            })?;
            row.push(value);
        }
        dates.push(date);
        rows.push(row);
    }

    Ok(DatedTable {
        dates,
        columns,
        rows,
    })
}
