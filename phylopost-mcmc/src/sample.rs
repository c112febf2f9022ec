//! The combined posterior sample.
//!
//! A [`CombinedSample`] owns one table of draws and one table of
//! trajectories, both keyed by [`SampleKey`]. Construction (including
//! deserialization) checks the invariants every estimator relies on:
//!
//! - draw keys are unique, and every draw has one value per parameter
//! - all trajectories share one time axis and the same state variables
//! - every trajectory key is also a draw key

use std::collections::{HashMap, HashSet};
use std::path::Path;

use phylopost_core::{PhylopostError, Result};
use serde::{Deserialize, Serialize};

use crate::chain::{Draw, Trajectory};
use crate::joiner::SampleKey;

/// Combined parameter draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DrawTableRepr")]
pub struct DrawTable {
    parameters: Vec<String>,
    draws: Vec<Draw<SampleKey>>,
    #[serde(skip)]
    index: HashMap<SampleKey, usize>,
}

#[derive(Deserialize)]
struct DrawTableRepr {
    parameters: Vec<String>,
    draws: Vec<Draw<SampleKey>>,
}

impl TryFrom<DrawTableRepr> for DrawTable {
    type Error = PhylopostError;

    fn try_from(repr: DrawTableRepr) -> Result<Self> {
        DrawTable::new(repr.parameters, repr.draws)
    }
}

impl DrawTable {
    pub fn new(parameters: Vec<String>, draws: Vec<Draw<SampleKey>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(draws.len());
        for (i, draw) in draws.iter().enumerate() {
            if draw.values.len() != parameters.len() {
                return Err(PhylopostError::Validation(format!(
                    "draw {} has {} values for {} parameters",
                    draw.key,
                    draw.values.len(),
                    parameters.len()
                )));
            }
            if index.insert(draw.key, i).is_some() {
                return Err(PhylopostError::Validation(format!(
                    "duplicate sample key {}",
                    draw.key
                )));
            }
        }
        Ok(Self {
            parameters,
            draws,
            index,
        })
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn draws(&self) -> &[Draw<SampleKey>] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn contains(&self, key: &SampleKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &SampleKey) -> Option<&Draw<SampleKey>> {
        self.index.get(key).map(|&i| &self.draws[i])
    }

    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p == name)
    }

    /// Value of parameter `name` in the draw `key`.
    pub fn value(&self, key: &SampleKey, name: &str) -> Option<f64> {
        let p = self.parameter_index(name)?;
        self.get(key).map(|d| d.values[p])
    }

    /// All values of parameter `name`, in draw order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let p = self.parameter_index(name)?;
        Some(self.draws.iter().map(|d| d.values[p]).collect())
    }
}

/// Combined trajectories on one shared time axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryTableRepr")]
pub struct TrajectoryTable {
    variables: Vec<String>,
    trajectories: Vec<Trajectory<SampleKey>>,
}

#[derive(Deserialize)]
struct TrajectoryTableRepr {
    variables: Vec<String>,
    trajectories: Vec<Trajectory<SampleKey>>,
}

impl TryFrom<TrajectoryTableRepr> for TrajectoryTable {
    type Error = PhylopostError;

    fn try_from(repr: TrajectoryTableRepr) -> Result<Self> {
        TrajectoryTable::new(repr.variables, repr.trajectories)
    }
}

/// Relative tolerance when comparing time axes.
const TIME_TOL: f64 = 1e-9;

impl TrajectoryTable {
    pub fn new(variables: Vec<String>, trajectories: Vec<Trajectory<SampleKey>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(trajectories.len());
        for traj in &trajectories {
            if !seen.insert(traj.key) {
                return Err(PhylopostError::Validation(format!(
                    "duplicate trajectory key {}",
                    traj.key
                )));
            }
            if traj.states.len() != variables.len()
                || traj.states.iter().any(|s| s.len() != traj.times.len())
            {
                return Err(PhylopostError::Validation(format!(
                    "trajectory {}: state table does not match {} variables x {} times",
                    traj.key,
                    variables.len(),
                    traj.times.len()
                )));
            }
        }
        if let Some(first) = trajectories.first() {
            for traj in &trajectories[1..] {
                if !same_axis(&first.times, &traj.times) {
                    return Err(PhylopostError::Validation(format!(
                        "trajectory {} does not share the time axis of trajectory {}",
                        traj.key, first.key
                    )));
                }
            }
        }
        Ok(Self {
            variables,
            trajectories,
        })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn trajectories(&self) -> &[Trajectory<SampleKey>] {
        &self.trajectories
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// The shared time axis (empty when there are no trajectories).
    pub fn times(&self) -> &[f64] {
        self.trajectories
            .first()
            .map(|t| t.times.as_slice())
            .unwrap_or(&[])
    }

    pub fn max_time(&self) -> Option<f64> {
        self.times().last().copied()
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }
}

fn same_axis(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= TIME_TOL * x.abs().max(1.0))
}

/// Draws and trajectories of the retained chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CombinedSampleRepr")]
pub struct CombinedSample {
    draws: DrawTable,
    trajectories: TrajectoryTable,
}

#[derive(Deserialize)]
struct CombinedSampleRepr {
    draws: DrawTable,
    trajectories: TrajectoryTable,
}

impl TryFrom<CombinedSampleRepr> for CombinedSample {
    type Error = PhylopostError;

    fn try_from(repr: CombinedSampleRepr) -> Result<Self> {
        CombinedSample::new(repr.draws, repr.trajectories)
    }
}

impl CombinedSample {
    /// Pair a draw table with a trajectory table. Every trajectory needs a
    /// draw; draws without a trajectory are allowed.
    pub fn new(draws: DrawTable, trajectories: TrajectoryTable) -> Result<Self> {
        if let Some(orphan) = trajectories
            .trajectories()
            .iter()
            .find(|t| !draws.contains(&t.key))
        {
            return Err(PhylopostError::Validation(format!(
                "trajectory {} has no matching draw",
                orphan.key
            )));
        }
        Ok(Self {
            draws,
            trajectories,
        })
    }

    /// A sample without trajectories.
    pub fn draws_only(draws: DrawTable) -> Self {
        Self {
            draws,
            trajectories: TrajectoryTable::default(),
        }
    }

    pub fn draws(&self) -> &DrawTable {
        &self.draws
    }

    pub fn trajectories(&self) -> &TrajectoryTable {
        &self.trajectories
    }

    /// Each trajectory with the draw that produced it.
    pub fn paired(&self) -> impl Iterator<Item = (&Draw<SampleKey>, &Trajectory<SampleKey>)> {
        self.trajectories
            .trajectories()
            .iter()
            .filter_map(move |t| self.draws.get(&t.key).map(|d| (d, t)))
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        phylopost_io::save_json(path, self)
    }

    /// Load a sample written by [`save_json`](Self::save_json), checking
    /// the invariants again.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        phylopost_io::load_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(sample: u64, chain: usize) -> SampleKey {
        SampleKey { sample, chain }
    }

    fn draw(sample: u64, chain: usize, b: f64) -> Draw<SampleKey> {
        Draw {
            key: key(sample, chain),
            log_posterior: -10.0,
            values: vec![b, f64::NAN],
        }
    }

    fn traj(sample: u64, chain: usize, times: Vec<f64>) -> Trajectory<SampleKey> {
        let n = times.len();
        Trajectory {
            key: key(sample, chain),
            times,
            states: vec![vec![100.0; n]],
        }
    }

    fn params() -> Vec<String> {
        vec!["b".into(), "tau".into()]
    }

    #[test]
    fn draw_table_lookup() {
        let table = DrawTable::new(params(), vec![draw(10, 0, 15.0), draw(10, 1, 14.0)]).unwrap();
        assert_eq!(table.value(&key(10, 1), "b"), Some(14.0));
        assert_eq!(table.value(&key(10, 2), "b"), None);
        assert_eq!(table.column("b"), Some(vec![15.0, 14.0]));
        assert!(table.column("p_h").is_none());
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = DrawTable::new(params(), vec![draw(10, 0, 15.0), draw(10, 0, 14.0)]).unwrap_err();
        assert!(matches!(err, PhylopostError::Validation(_)));
    }

    #[test]
    fn mismatched_time_axes_rejected() {
        let err = TrajectoryTable::new(
            vec!["S".into()],
            vec![traj(1, 0, vec![0.0, 1.0]), traj(2, 0, vec![0.0, 2.0])],
        )
        .unwrap_err();
        assert!(matches!(err, PhylopostError::Validation(_)));
        assert!(TrajectoryTable::new(
            vec!["S".into()],
            vec![traj(1, 0, vec![0.0, 1.0]), traj(2, 0, vec![0.0])],
        )
        .is_err());
    }

    #[test]
    fn trajectory_needs_draw() {
        let draws = DrawTable::new(params(), vec![draw(1, 0, 15.0), draw(2, 0, 15.0)]).unwrap();
        let trajectories =
            TrajectoryTable::new(vec!["S".into()], vec![traj(3, 0, vec![0.0])]).unwrap();
        assert!(CombinedSample::new(draws.clone(), trajectories).is_err());

        let trajectories =
            TrajectoryTable::new(vec!["S".into()], vec![traj(2, 0, vec![0.0, 0.5])]).unwrap();
        let sample = CombinedSample::new(draws, trajectories).unwrap();
        assert_eq!(sample.paired().count(), 1);
        assert_eq!(sample.trajectories().times(), &[0.0, 0.5]);
        assert_eq!(sample.trajectories().max_time(), Some(0.5));
    }

    #[test]
    fn json_round_trip_revalidates() {
        let draws = DrawTable::new(params(), vec![draw(1, 0, 15.0), draw(1, 2, 16.0)]).unwrap();
        let trajectories =
            TrajectoryTable::new(vec!["S".into()], vec![traj(1, 2, vec![0.0, 1.0])]).unwrap();
        let sample = CombinedSample::new(draws, trajectories).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("combined.json");
        sample.save_json(&path).unwrap();
        let loaded = CombinedSample::load_json(&path).unwrap();
        assert_eq!(loaded.draws().len(), 2);
        assert_eq!(loaded.draws().value(&key(1, 2), "b"), Some(16.0));
        assert!(loaded.draws().value(&key(1, 2), "tau").unwrap().is_nan());
        assert_eq!(loaded.paired().count(), 1);

        // Hand-edited file with an orphan trajectory.
        let text = std::fs::read_to_string(&path)
            .unwrap()
            .replace(r#""chain":2},"times""#, r#""chain":5},"times""#);
        std::fs::write(&path, text).unwrap();
        let err = CombinedSample::load_json(&path).unwrap_err();
        assert!(matches!(err, PhylopostError::Validation(_)), "{:?}", err);
    }

    #[test]
    fn reloaded_mismatched_time_axes_keep_validation_kind() {
        let draws = DrawTable::new(params(), vec![draw(1, 0, 15.0), draw(1, 2, 16.0)]).unwrap();
        let trajectories = TrajectoryTable::new(
            vec!["S".into()],
            vec![traj(1, 0, vec![0.0, 1.0]), traj(1, 2, vec![0.0, 1.0])],
        )
        .unwrap();
        let sample = CombinedSample::new(draws, trajectories).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("combined.json");
        sample.save_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches(r#""times":[0.0,1.0]"#).count(), 2);
        std::fs::write(
            &path,
            text.replacen(r#""times":[0.0,1.0]"#, r#""times":[0.0,2.0]"#, 1),
        )
        .unwrap();

        let err = CombinedSample::load_json(&path).unwrap_err();
        assert!(matches!(err, PhylopostError::Validation(_)), "{:?}", err);
        assert!(err.to_string().contains("time axis"), "{}", err);
        assert!(!err.is_load_failure());
    }
}
