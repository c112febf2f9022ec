//! Chain data model: parameter draws and simulated trajectories.
//!
//! A chain is read once from its raw tables and never mutated afterwards.
//! Draws and trajectories are generic over their key so the same types
//! serve a single chain (keyed by the intra-chain sample id) and the
//! combined sample (keyed by [`SampleKey`](crate::joiner::SampleKey)).

use std::collections::{BTreeMap, HashSet};

use phylopost_core::{Annotated, PhylopostError, Result};
use phylopost_io::NumericTable;
use serde::{Deserialize, Serialize};

use crate::config::ColumnNames;

/// One posterior draw: log-posterior density plus named parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw<K = u64> {
    pub key: K,
    pub log_posterior: f64,
    /// Parameter values, aligned with the owning table's parameter names.
    /// Missing values are NaN.
    #[serde(with = "missing")]
    pub values: Vec<f64>,
}

/// The ordered draws of one chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTrace {
    pub parameters: Vec<String>,
    pub draws: Vec<Draw>,
}

impl ParameterTrace {
    /// Build a trace from a raw parameter log.
    ///
    /// Every column other than the sample id and the log posterior is a
    /// parameter. Rows keep their file order, which is the sampling order.
    pub fn from_table(table: &NumericTable, columns: &ColumnNames) -> Result<Self> {
        let sample_idx = table.column_index(&columns.sample)?;
        let lp_idx = table.column_index(&columns.log_posterior)?;
        let param_idx: Vec<usize> = (0..table.columns.len())
            .filter(|&i| i != sample_idx && i != lp_idx)
            .collect();

        let mut seen = HashSet::with_capacity(table.len());
        let mut draws = Vec::with_capacity(table.len());
        for (row_num, row) in table.rows.iter().enumerate() {
            let key = sample_id(row[sample_idx], row_num + 1)?;
            if !seen.insert(key) {
                return Err(PhylopostError::Parse(format!(
                    "row {}: duplicate sample id {}",
                    row_num + 1,
                    key
                )));
            }
            let log_posterior = row[lp_idx];
            if !log_posterior.is_finite() {
                return Err(PhylopostError::Parse(format!(
                    "row {}: log posterior must be finite, got {}",
                    row_num + 1,
                    log_posterior
                )));
            }
            draws.push(Draw {
                key,
                log_posterior,
                values: param_idx.iter().map(|&i| row[i]).collect(),
            });
        }

        Ok(Self {
            parameters: param_idx
                .iter()
                .map(|&i| table.columns[i].clone())
                .collect(),
            draws,
        })
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Log-posterior densities in sampling order.
    pub fn log_posteriors(&self) -> Vec<f64> {
        self.draws.iter().map(|d| d.log_posterior).collect()
    }
}

/// One simulated epidemic time series, associated with exactly one draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory<K = u64> {
    pub key: K,
    /// Time points in increasing order.
    pub times: Vec<f64>,
    /// State values indexed `[variable][time]`. Missing values are NaN.
    #[serde(with = "missing::nested")]
    pub states: Vec<Vec<f64>>,
}

/// The trajectories of one chain, ordered by ascending sample id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectorySet {
    pub variables: Vec<String>,
    pub trajectories: Vec<Trajectory>,
}

impl TrajectorySet {
    /// Build a trajectory set from a long-format table: one row per
    /// (sample id, time) pair.
    ///
    /// Every column other than the sample id and time is a state variable.
    /// Rows of one sample may appear in any order; they are sorted by time.
    pub fn from_table(table: &NumericTable, columns: &ColumnNames) -> Result<Self> {
        let sample_idx = table.column_index(&columns.sample)?;
        let time_idx = table.column_index(&columns.time)?;
        let var_idx: Vec<usize> = (0..table.columns.len())
            .filter(|&i| i != sample_idx && i != time_idx)
            .collect();

        let mut grouped: BTreeMap<u64, Vec<&Vec<f64>>> = BTreeMap::new();
        for (row_num, row) in table.rows.iter().enumerate() {
            let key = sample_id(row[sample_idx], row_num + 1)?;
            if !row[time_idx].is_finite() {
                return Err(PhylopostError::Parse(format!(
                    "row {}: time must be finite",
                    row_num + 1
                )));
            }
            grouped.entry(key).or_default().push(row);
        }

        let trajectories = grouped
            .into_iter()
            .map(|(key, mut rows)| {
                rows.sort_by(|a, b| a[time_idx].total_cmp(&b[time_idx]));
                Trajectory {
                    key,
                    times: rows.iter().map(|r| r[time_idx]).collect(),
                    states: var_idx
                        .iter()
                        .map(|&v| rows.iter().map(|r| r[v]).collect())
                        .collect(),
                }
            })
            .collect();

        Ok(Self {
            variables: var_idx.iter().map(|&i| table.columns[i].clone()).collect(),
            trajectories,
        })
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}

/// One independent inference run after burn-in removal.
#[derive(Debug, Clone)]
pub struct Chain {
    /// Position in the caller's input list. Used to disambiguate sample ids.
    pub index: usize,
    /// Where the chain came from (usually the parameter log path).
    pub source: String,
    pub trace: ParameterTrace,
    pub trajectories: Option<TrajectorySet>,
}

impl Annotated for Chain {
    fn name(&self) -> &str {
        &self.source
    }
}

/// Interpret a numeric field as a sample id.
fn sample_id(value: f64, row_num: usize) -> Result<u64> {
    // Integers above 2^53 are not exact in f64.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= MAX_EXACT {
        Ok(value as u64)
    } else {
        Err(PhylopostError::Parse(format!(
            "row {}: sample id must be a non-negative integer, got {}",
            row_num, value
        )))
    }
}

/// JSON has no NaN, so missing values travel as `null`.
pub(crate) mod missing {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    fn encode(values: &[f64]) -> Vec<Option<f64>> {
        values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect()
    }

    fn decode(values: Vec<Option<f64>>) -> Vec<f64> {
        values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        encode(values).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Ok(decode(Vec::deserialize(deserializer)?))
    }

    pub mod nested {
        use super::*;

        pub fn serialize<S: Serializer>(
            values: &[Vec<f64>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            values
                .iter()
                .map(|row| encode(row))
                .collect::<Vec<_>>()
                .serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<f64>>, D::Error> {
            let rows: Vec<Vec<Option<f64>>> = Vec::deserialize(deserializer)?;
            Ok(rows.into_iter().map(decode).collect())
        }
    }
}
