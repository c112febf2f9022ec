//! Reading raw chain outputs and removing burn-in.
//!
//! Burn-in is always computed from the raw length of a chain: the first
//! `floor(p · n)` draws of the parameter log are dropped, and the first
//! `floor(p · k)` of the `k` distinct trajectory sample ids (ascending) are
//! dropped. A chain whose source cannot be read is recorded as a
//! [`LoadFailure`] and excluded; it never aborts the batch.

use std::fmt;
use std::path::{Path, PathBuf};

use phylopost_core::{PhylopostError, Result};
use phylopost_io::read_numeric_table;
use tracing::{debug, info, warn};

use crate::chain::{Chain, ParameterTrace, TrajectorySet};
use crate::config::CombineConfig;

/// The files making up one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSource {
    /// Parameter log.
    pub log: PathBuf,
    /// Simulated trajectories, when the chain produced them.
    pub trajectories: Option<PathBuf>,
}

impl ChainSource {
    /// A chain with a parameter log only.
    pub fn log(path: impl Into<PathBuf>) -> Self {
        Self {
            log: path.into(),
            trajectories: None,
        }
    }

    /// A chain with a parameter log and its trajectory table.
    pub fn paired(log: impl Into<PathBuf>, trajectories: impl Into<PathBuf>) -> Self {
        Self {
            log: log.into(),
            trajectories: Some(trajectories.into()),
        }
    }
}

impl fmt::Display for ChainSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.log.display())
    }
}

/// Number of leading elements discarded from `n` for burn-in fraction `p`.
pub fn burn_in_count(n: usize, fraction: f64) -> usize {
    ((fraction * n as f64).floor() as usize).min(n)
}

/// Drop the leading burn-in fraction of a trace.
pub fn trim_trace(trace: &ParameterTrace, fraction: f64) -> ParameterTrace {
    let drop = burn_in_count(trace.len(), fraction);
    ParameterTrace {
        parameters: trace.parameters.clone(),
        draws: trace.draws[drop..].to_vec(),
    }
}

/// Drop the trajectories with the smallest sample ids.
///
/// The count is a fraction of distinct ids, not of table rows.
pub fn trim_trajectories(set: &TrajectorySet, fraction: f64) -> TrajectorySet {
    let drop = burn_in_count(set.len(), fraction);
    // Sets built by `from_table` are already ordered by id.
    let mut trajectories = set.trajectories.clone();
    trajectories.sort_by_key(|t| t.key);
    TrajectorySet {
        variables: set.variables.clone(),
        trajectories: trajectories.split_off(drop),
    }
}

/// Read one chain and remove burn-in.
///
/// A chain with no draws left after burn-in cannot be compared with the
/// others and fails like an unreadable source.
pub fn load_chain(index: usize, source: &ChainSource, config: &CombineConfig) -> Result<Chain> {
    let raw = read_numeric_table(&source.log)?;
    let trace = ParameterTrace::from_table(&raw, &config.columns)
        .map_err(|e| e.context(source.log.display()))?;
    let raw_len = trace.len();
    let trace = trim_trace(&trace, config.burn_in);
    if trace.is_empty() {
        return Err(PhylopostError::Parse(format!(
            "{}: no draws remain after burn-in ({} raw)",
            source.log.display(),
            raw_len
        )));
    }

    let trajectories = match &source.trajectories {
        Some(path) => Some(load_trajectories(path, config)?),
        None => None,
    };

    debug!(
        chain = index,
        source = %source,
        raw = raw_len,
        kept = trace.len(),
        trajectories = trajectories.as_ref().map_or(0, TrajectorySet::len),
        "Loaded chain"
    );

    Ok(Chain {
        index,
        source: source.to_string(),
        trace,
        trajectories,
    })
}

fn load_trajectories(path: &Path, config: &CombineConfig) -> Result<TrajectorySet> {
    let raw = read_numeric_table(path)?;
    let set =
        TrajectorySet::from_table(&raw, &config.columns).map_err(|e| e.context(path.display()))?;
    Ok(trim_trajectories(&set, config.burn_in))
}

/// A chain that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub index: usize,
    pub source: String,
    pub reason: String,
}

/// Outcome of loading a batch of chains.
#[derive(Debug, Clone, Default)]
pub struct LoadedBatch {
    /// Successfully loaded chains, in input order.
    pub chains: Vec<Chain>,
    /// Chains excluded because their source was unreadable.
    pub failures: Vec<LoadFailure>,
}

/// Load every chain of a batch.
///
/// Unreadable sources are recorded in [`LoadedBatch::failures`]; any other
/// error (an invalid configuration) aborts. Chains are independent, so with
/// the `parallel` feature they are read concurrently.
pub fn load_chains(sources: &[ChainSource], config: &CombineConfig) -> Result<LoadedBatch> {
    config.validate()?;

    #[cfg(feature = "parallel")]
    let results: Vec<Result<Chain>> = {
        use rayon::prelude::*;
        sources
            .par_iter()
            .enumerate()
            .map(|(i, source)| load_chain(i, source, config))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<Chain>> = sources
        .iter()
        .enumerate()
        .map(|(i, source)| load_chain(i, source, config))
        .collect();

    let mut batch = LoadedBatch::default();
    for (index, (source, result)) in sources.iter().zip(results).enumerate() {
        match result {
            Ok(chain) => batch.chains.push(chain),
            Err(e) if e.is_load_failure() => {
                warn!(chain = index, source = %source, error = %e, "Chain excluded");
                batch.failures.push(LoadFailure {
                    index,
                    source: source.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        loaded = batch.chains.len(),
        failed = batch.failures.len(),
        burn_in = config.burn_in,
        "Loaded chains"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Draw, Trajectory};
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn trace_of(n: usize) -> ParameterTrace {
        ParameterTrace {
            parameters: vec!["b".into()],
            draws: (0..n as u64)
                .map(|k| Draw {
                    key: k * 10,
                    log_posterior: -(k as f64),
                    values: vec![k as f64],
                })
                .collect(),
        }
    }

    fn write_log(dir: &TempDir, name: &str, n: usize) -> PathBuf {
        let mut text = String::from("Sample\tposterior\tb\n");
        for k in 0..n {
            text.push_str(&format!("{}\t{}\t{}\n", k * 10, -100.0 - k as f64, 15.0));
        }
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn burn_in_count_floors() {
        assert_eq!(burn_in_count(10, 0.5), 5);
        assert_eq!(burn_in_count(11, 0.5), 5);
        assert_eq!(burn_in_count(3, 0.0), 0);
        assert_eq!(burn_in_count(0, 0.5), 0);
        assert_eq!(burn_in_count(9, 0.99), 8);
    }

    #[test]
    fn trim_trajectories_by_distinct_id() {
        let set = TrajectorySet {
            variables: vec!["S".into()],
            trajectories: [40u64, 10, 30, 20, 50]
                .iter()
                .map(|&key| Trajectory {
                    key,
                    times: vec![0.0, 1.0, 2.0],
                    states: vec![vec![1.0, 2.0, 3.0]],
                })
                .collect(),
        };
        let trimmed = trim_trajectories(&set, 0.5);
        let keys: Vec<u64> = trimmed.trajectories.iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![30, 40, 50]);
    }

    #[test]
    fn load_chain_trims_from_raw_length() {
        let dir = TempDir::new().unwrap();
        let log = write_log(&dir, "c0.log", 9);
        let config = CombineConfig {
            burn_in: 0.5,
            ..Default::default()
        };
        let chain = load_chain(2, &ChainSource::log(&log), &config).unwrap();
        assert_eq!(chain.index, 2);
        assert_eq!(chain.trace.len(), 5);
        assert_eq!(chain.trace.draws[0].key, 40);
        assert!(chain.trajectories.is_none());
    }

    #[test]
    fn load_chain_with_trajectories() {
        let dir = TempDir::new().unwrap();
        let log = write_log(&dir, "c0.log", 4);
        let traj = dir.path().join("c0.traj");
        let mut text = String::from("Sample\tt\tS\n");
        for id in [0, 10, 20, 30] {
            for t in [0.0, 0.5] {
                text.push_str(&format!("{}\t{}\t{}\n", id, t, 100));
            }
        }
        fs::write(&traj, text).unwrap();

        let chain = load_chain(0, &ChainSource::paired(&log, &traj), &CombineConfig::default())
            .unwrap();
        let set = chain.trajectories.unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.trajectories[0].key, 20);
    }

    #[test]
    fn load_chain_everything_burned() {
        let dir = TempDir::new().unwrap();
        let log = write_log(&dir, "c0.log", 1);
        let config = CombineConfig {
            burn_in: 0.9,
            ..Default::default()
        };
        // floor(0.9) = 0, so a single draw survives.
        assert!(load_chain(0, &ChainSource::log(&log), &config).is_ok());

        let empty = dir.path().join("empty.log");
        fs::write(&empty, "Sample\tposterior\n").unwrap();
        let err = load_chain(0, &ChainSource::log(&empty), &config).unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn load_chains_records_failures() {
        let dir = TempDir::new().unwrap();
        let good = write_log(&dir, "good.log", 10);
        let bad_columns = dir.path().join("bad.log");
        fs::write(&bad_columns, "iter,lp\n1,2\n").unwrap();
        let sources = vec![
            ChainSource::log(&good),
            ChainSource::log(dir.path().join("missing.log")),
            ChainSource::log(&bad_columns),
        ];

        let batch = load_chains(&sources, &CombineConfig::default()).unwrap();
        assert_eq!(batch.chains.len(), 1);
        assert_eq!(batch.chains[0].index, 0);
        assert_eq!(batch.failures.len(), 2);
        assert_eq!(batch.failures[0].index, 1);
        assert!(batch.failures[0].source.ends_with("missing.log"));
        assert!(batch.failures[1].reason.contains("missing column"));
    }

    #[test]
    fn load_chains_rejects_bad_config() {
        let config = CombineConfig {
            burn_in: 1.5,
            ..Default::default()
        };
        assert!(load_chains(&[], &config).is_err());
    }

    proptest! {
        #[test]
        fn trimmed_trace_is_suffix(n in 0usize..300, p in 0.0f64..1.0) {
            let trace = trace_of(n);
            let trimmed = trim_trace(&trace, p);
            prop_assert_eq!(trimmed.len(), n - (p * n as f64).floor() as usize);
            prop_assert_eq!(&trimmed.draws[..], &trace.draws[n - trimmed.len()..]);
        }
    }
}
