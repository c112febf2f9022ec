//! Tabular input and output for the phylopost workspace.
//!
//! - **Numeric tables**: CSV/TSV parameter logs and trajectory tables
//! - **Dated tables**: reported case counts keyed by calendar date
//! - **Persistence**: summary tables as CSV, combined samples as JSON

pub mod dated;
pub mod persist;
pub mod table;

pub use dated::{read_dated_table, DatedTable};
pub use persist::{load_json, save_json, write_records};
pub use table::{read_numeric_table, NumericTable};
