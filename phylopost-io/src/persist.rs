//! Writing summary tables and persisting serialized objects.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use phylopost_core::{PhylopostError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::error::Category;

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| PhylopostError::Io(e).context(path.display()))
}

/// Write `records` as CSV with a header derived from the record fields.
pub fn write_records<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = ::csv::Writer::from_writer(BufWriter::new(create(path)?));
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| PhylopostError::Other(format!("{}: {}", path.display(), e)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Serialize `value` as JSON to `path`.
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(create(path)?);
    serde_json::to_writer(&mut writer, value)
        .map_err(|e| PhylopostError::Other(format!("{}: {}", path.display(), e)))?;
    writer.flush()?;
    Ok(())
}

/// Deserialize a JSON value previously written by [`save_json`].
///
/// Malformed or truncated JSON is a [`PhylopostError::Parse`] failure.
/// Well-formed JSON that the target type rejects, including invariant checks
/// run through `#[serde(try_from)]`, is a [`PhylopostError::Validation`]
/// failure.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PhylopostError::Io(e).context(path.display()))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| match e.classify() {
        Category::Io => PhylopostError::Io(e.into()).context(path.display()),
        Category::Data => PhylopostError::Validation(format!("{}: {}", path.display(), e)),
        Category::Syntax | Category::Eof => {
            PhylopostError::Parse(format!("{}: {}", path.display(), e))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        time: f64,
        median: f64,
    }

    #[test]
    fn write_records_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rt.csv");
        write_records(
            &path,
            &[Row {
                time: 2020.1,
                median: 1.5,
            }],
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), "time,median");
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn json_persists_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let rows = vec![
            Row {
                time: 1.0,
                median: 2.0,
            },
            Row {
                time: 3.0,
                median: 4.0,
            },
        ];
        save_json(&path, &rows).unwrap();
        let back: Vec<Row> = load_json(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn load_json_missing_file() {
        let err = load_json::<Vec<f64>>("/nonexistent/sample.json").unwrap_err();
        assert!(matches!(err, PhylopostError::Io(_)));
    }

    #[test]
    fn load_json_malformed_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, r#"[{"time": 1.0, "median""#).unwrap();
        let err = load_json::<Vec<Row>>(&path).unwrap_err();
        assert!(matches!(err, PhylopostError::Parse(_)), "{:?}", err);
    }

    #[test]
    fn load_json_rejected_content_is_validation_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, r#"[{"time": 1.0}]"#).unwrap();
        let err = load_json::<Vec<Row>>(&path).unwrap_err();
        assert!(matches!(err, PhylopostError::Validation(_)), "{:?}", err);
        assert!(!err.is_load_failure());
    }
}
