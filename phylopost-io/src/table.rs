//! CSV/TSV parsing of numeric tables.
//!
//! MCMC parameter logs and simulated trajectory tables are plain delimited
//! text with a header row. The delimiter is sniffed from the header (tab if
//! present, comma otherwise), lines starting with `#` are comments, and the
//! missing-value markers `NA`, `NaN` and the empty field become `f64::NAN`.

use std::fs;
use std::path::Path;

use ::csv::{ReaderBuilder, StringRecord, Trim};
use phylopost_core::{PhylopostError, Result};

/// A header row plus numeric rows, every row as wide as the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl NumericTable {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the header.
    ///
    /// A missing column is a [`PhylopostError::Parse`] error: the source does
    /// not have the shape the caller expects.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PhylopostError::Parse(format!("missing column '{}'", name)))
    }

    /// All values of column `name`, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }
}

/// Read a delimited numeric table from `path`.
pub fn read_numeric_table(path: impl AsRef<Path>) -> Result<NumericTable> {
    let path = path.as_ref();
    let text = read_source(path)?;
    parse_numeric_table(&text).map_err(|e| e.context(path.display()))
}

/// Parse a delimited numeric table from in-memory text.
pub fn parse_numeric_table(text: &str) -> Result<NumericTable> {
    let mut reader = reader_for(text);
    let columns = header(&mut reader)?;

    let mut rows = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let record = result.map_err(|e| PhylopostError::Parse(e.to_string()))?;
        rows.push(parse_row(&record, &columns, row_num + 1)?);
    }

    Ok(NumericTable { columns, rows })
}

// ── Shared helpers ─────────────────────────────────────────────────────────

/// Read a whole file, attaching the path to I/O errors.
pub(crate) fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| PhylopostError::Io(e).context(path.display()))
}

/// Build a reader for `text`, sniffing the delimiter from the first
/// non-comment line.
pub(crate) fn reader_for(text: &str) -> ::csv::Reader<&[u8]> {
    let first = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .unwrap_or("");
    let delimiter = if first.contains('\t') { b'\t' } else { b',' };
    ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(text.as_bytes())
}

pub(crate) fn header(reader: &mut ::csv::Reader<&[u8]>) -> Result<Vec<String>> {
    let headers = reader
        .headers()
        .map_err(|e| PhylopostError::Parse(e.to_string()))?;
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(PhylopostError::Parse("empty header row".into()));
    }
    Ok(headers.iter().map(|s| s.to_string()).collect())
}

/// Parse one numeric field. `NA`, `NaN` and the empty string are missing.
pub(crate) fn parse_value(field: &str) -> Option<f64> {
    match field {
        "" | "NA" | "NaN" | "nan" => Some(f64::NAN),
        _ => field.parse::<f64>().ok(),
    }
}

fn parse_row(record: &StringRecord, columns: &[String], row_num: usize) -> Result<Vec<f64>> {
    if record.len() != columns.len() {
        return Err(PhylopostError::Parse(format!(
            "row {}: expected {} fields, found {}",
            row_num,
            columns.len(),
            record.len()
        )));
    }
    record
        .iter()
        .zip(columns)
        .map(|(field, col)| {
            parse_value(field).ok_or_else(|| {
                PhylopostError::Parse(format!(
                    "row {}: column '{}': invalid number '{}'",
                    row_num, col, field
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_tab_separated_log() {
        let text = "# generated by the sampler\nSample\tposterior\tb\n0\t-1023.5\t15.1\n10\t-1019.25\t14.8\n";
        let table = parse_numeric_table(text).unwrap();
        assert_eq!(table.columns, vec!["Sample", "posterior", "b"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("posterior").unwrap(), vec![-1023.5, -1019.25]);
    }

    #[test]
    fn parse_comma_separated_with_missing() {
        let text = "Sample,t,S\n1,2020.1,NA\n1,2020.2,\n";
        let table = parse_numeric_table(text).unwrap();
        assert!(table.rows[0][2].is_nan());
        assert!(table.rows[1][2].is_nan());
    }

    #[test]
    fn missing_column_is_parse_error() {
        let table = parse_numeric_table("a,b\n1,2\n").unwrap();
        let err = table.column("posterior").unwrap_err();
        assert!(err.is_load_failure());
        assert!(err.to_string().contains("posterior"));
    }

    #[test]
    fn invalid_number_reports_row_and_column() {
        let err = parse_numeric_table("a,b\n1,2\n3,x\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 2"), "{}", msg);
        assert!(msg.contains("'b'"), "{}", msg);
    }

    #[test]
    fn ragged_row_rejected() {
        assert!(parse_numeric_table("a,b\n1,2,3\n").is_err());
    }

    #[test]
    fn read_from_file() {
        let mut file = NamedTempFile::with_suffix(".log").unwrap();
        writeln!(file, "Sample\tposterior").unwrap();
        writeln!(file, "0\t-5.0").unwrap();
        file.flush().unwrap();

        let table = read_numeric_table(file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn file_not_found_is_load_failure() {
        let err = read_numeric_table("/nonexistent/chain.log").unwrap_err();
        assert!(matches!(err, PhylopostError::Io(_)));
        assert!(err.to_string().contains("/nonexistent/chain.log"));
    }
}
