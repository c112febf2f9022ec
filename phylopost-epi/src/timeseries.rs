//! Time-indexed quantities, summarized across draws at each time point.
//!
//! Quantiles are cross-sectional: every time point is summarized on its
//! own, over the draws whose value there is finite. A missing state value
//! only removes that draw from that time point. Time points where no draw
//! has a value are left out of the summary.

use std::path::Path;

use chrono::NaiveDate;
use phylopost_core::{PhylopostError, Result};
use phylopost_mcmc::{CombinedSample, SampleKey, Trajectory, TrajectoryTable};
use phylopost_stats::credible_interval;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EstimatorConfig;
use crate::dates::decimal_year_to_date;
use crate::estimate::{reproduction_number, DAYS_PER_YEAR};
use crate::params::{ModelParams, ParamColumns};

/// Median and interval of a quantity at one time point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Decimal-year time.
    pub time: f64,
    /// Calendar day containing `time`.
    pub date: NaiveDate,
    pub median: f64,
    pub lower: f64,
    pub upper: f64,
    /// Draws contributing to this time point.
    pub n: usize,
}

/// A time-indexed summary of one derived quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct EpidemicSummary {
    pub quantity: String,
    pub rows: Vec<SummaryRow>,
}

impl EpidemicSummary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write as CSV with columns `time,date,median,lower,upper,n`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        phylopost_io::write_records(path, &self.rows)
    }
}

/// Summarize `values[draw][time]` at each of `times`.
pub(crate) fn summarize_over_time(
    quantity: &str,
    times: &[f64],
    values: &[Vec<f64>],
    level: f64,
) -> Result<EpidemicSummary> {
    let mut rows = Vec::with_capacity(times.len());
    let mut column = Vec::with_capacity(values.len());
    for (j, &time) in times.iter().enumerate() {
        column.clear();
        column.extend(
            values
                .iter()
                .filter_map(|draw| draw.get(j).copied())
                .filter(|v| v.is_finite()),
        );
        if column.is_empty() {
            continue;
        }
        let interval = credible_interval(&column, level)?;
        rows.push(SummaryRow {
            time,
            date: decimal_year_to_date(time)?,
            median: interval.median,
            lower: interval.lower,
            upper: interval.upper,
            n: column.len(),
        });
    }
    debug!(
        quantity,
        rows = rows.len(),
        skipped = times.len() - rows.len(),
        "Summarized time series"
    );
    Ok(EpidemicSummary {
        quantity: quantity.to_string(),
        rows,
    })
}

/// Positions of the state variables in a trajectory table.
struct StateIndex {
    s: usize,
    e: usize,
    il: usize,
    ih: usize,
    r: usize,
}

fn state_index(table: &TrajectoryTable, name: &str) -> Result<usize> {
    table.variable_index(name).ok_or_else(|| {
        PhylopostError::Validation(format!("trajectories have no '{}' state variable", name))
    })
}

impl StateIndex {
    fn resolve(table: &TrajectoryTable, config: &EstimatorConfig) -> Result<Self> {
        let names = &config.state;
        Ok(Self {
            s: state_index(table, &names.susceptible)?,
            e: state_index(table, &names.exposed)?,
            il: state_index(table, &names.infectious_low)?,
            ih: state_index(table, &names.infectious_high)?,
            r: state_index(table, &names.recovered)?,
        })
    }

    /// Susceptible fraction of the population at time index `t`.
    fn susceptible_fraction(&self, traj: &Trajectory<SampleKey>, t: usize) -> f64 {
        let x = |i: usize| traj.states[i][t];
        let total = x(self.s) + x(self.e) + x(self.il) + x(self.ih) + x(self.r);
        x(self.s) / total
    }
}

/// Each trajectory with its draw's model parameters.
fn paired_params<'a>(
    sample: &'a CombinedSample,
    config: &EstimatorConfig,
) -> Result<Vec<(ModelParams, &'a Trajectory<SampleKey>)>> {
    config.validate()?;
    if sample.trajectories().is_empty() {
        return Err(PhylopostError::Validation(
            "combined sample has no trajectories".into(),
        ));
    }
    let columns = ParamColumns::resolve(sample.draws(), config)?;
    let pairs: Vec<_> = sample
        .paired()
        .map(|(draw, traj)| (ModelParams::from_draw(draw, &columns), traj))
        .collect();
    let defaulted = pairs.iter().filter(|(p, _)| p.defaulted).count();
    if defaulted > 0 {
        warn!(
            draws = defaulted,
            tau = config.defaults.tau,
            p_h = config.defaults.p_h,
            "Filled missing model parameters with defaults"
        );
    }
    Ok(pairs)
}

fn per_time(
    pairs: &[(ModelParams, &Trajectory<SampleKey>)],
    steps: usize,
    f: impl Fn(&ModelParams, &Trajectory<SampleKey>, usize) -> f64,
) -> Vec<Vec<f64>> {
    pairs
        .iter()
        .map(|(p, traj)| (0..steps).map(|t| f(p, traj, t)).collect())
        .collect()
}

/// Time-varying reproduction number: the draw's `R` scaled by the
/// susceptible fraction.
pub fn rt(sample: &CombinedSample, config: &EstimatorConfig) -> Result<EpidemicSummary> {
    let pairs = paired_params(sample, config)?;
    let table = sample.trajectories();
    let idx = StateIndex::resolve(table, config)?;
    let values = per_time(&pairs, table.times().len(), |p, traj, t| {
        reproduction_number(p, config.gamma1) * idx.susceptible_fraction(traj, t)
    });
    summarize_over_time("rt", table.times(), &values, config.interval)
}

/// New infections per day:
/// `(b·I_low + b·τ·I_high) · S/N / 365`.
pub fn daily_infections(
    sample: &CombinedSample,
    config: &EstimatorConfig,
) -> Result<EpidemicSummary> {
    let pairs = paired_params(sample, config)?;
    let table = sample.trajectories();
    let idx = StateIndex::resolve(table, config)?;
    let values = per_time(&pairs, table.times().len(), |p, traj, t| {
        let force = p.b * traj.states[idx.il][t] + p.b * p.tau * traj.states[idx.ih][t];
        force * idx.susceptible_fraction(traj, t) / DAYS_PER_YEAR
    });
    summarize_over_time("daily_infections", table.times(), &values, config.interval)
}

/// The trajectories' cumulative-infections state, as simulated.
pub fn cumulative_infections(
    sample: &CombinedSample,
    config: &EstimatorConfig,
) -> Result<EpidemicSummary> {
    let pairs = paired_params(sample, config)?;
    let table = sample.trajectories();
    let cumulative = state_index(table, &config.state.cumulative)?;
    let values = per_time(&pairs, table.times().len(), |_, traj, t| {
        traj.states[cumulative][t]
    });
    summarize_over_time("cumulative_infections", table.times(), &values, config.interval)
}

/// Infectious prevalence `I_low + I_high`.
pub fn prevalence(sample: &CombinedSample, config: &EstimatorConfig) -> Result<EpidemicSummary> {
    let pairs = paired_params(sample, config)?;
    let table = sample.trajectories();
    let il = state_index(table, &config.state.infectious_low)?;
    let ih = state_index(table, &config.state.infectious_high)?;
    let values = per_time(&pairs, table.times().len(), |_, traj, t| {
        traj.states[il][t] + traj.states[ih][t]
    });
    summarize_over_time("prevalence", table.times(), &values, config.interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_with;

    const TOL: f64 = 1e-9;

    #[test]
    fn rt_scales_by_susceptible_fraction() {
        // One draw, b = 15: R = 1.92328...
        let sample = sample_with(&[15.0], |_, t| {
            let t = t as f64;
            [750.0 - 250.0 * t, 0.0, 0.0, 0.0, 250.0 + 250.0 * t, 0.0]
        });
        let rt = rt(&sample, &EstimatorConfig::default()).unwrap();
        let r0 = 1.923282401966022;
        assert_eq!(rt.len(), 3);
        assert!((rt.rows[0].median - r0 * 0.75).abs() < TOL);
        assert!((rt.rows[1].median - r0 * 0.5).abs() < TOL);
        assert!((rt.rows[2].median - r0 * 0.25).abs() < TOL);
        assert_eq!(rt.rows[0].date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn daily_infections_formula() {
        // S = 500, Il = 10, Ih = 2, N = 1000, b = 15, tau = 74.
        let sample = sample_with(&[15.0], |_, _| [500.0, 100.0, 10.0, 2.0, 388.0, 0.0]);
        let daily = daily_infections(&sample, &EstimatorConfig::default()).unwrap();
        let expected = (15.0 * 10.0 + 15.0 * 74.0 * 2.0) * 0.5 / 365.0;
        assert!((daily.rows[0].median - expected).abs() < TOL);
    }

    #[test]
    fn missing_state_only_affects_its_time_point() {
        let sample = sample_with(&[15.0, 16.0], |draw, t| {
            let s = if draw == 0 && t == 1 { f64::NAN } else { 900.0 };
            [s, 0.0, 50.0, 0.0, 50.0, 10.0 * t as f64]
        });
        let rt = rt(&sample, &EstimatorConfig::default()).unwrap();
        assert_eq!(rt.rows.iter().map(|r| r.n).collect::<Vec<_>>(), vec![2, 1, 2]);
    }

    #[test]
    fn time_point_without_values_dropped() {
        let sample = sample_with(&[15.0, 16.0], |_, t| {
            let s = if t == 2 { f64::NAN } else { 900.0 };
            [s, 0.0, 50.0, 0.0, 50.0, 0.0]
        });
        let daily = daily_infections(&sample, &EstimatorConfig::default()).unwrap();
        assert_eq!(daily.len(), 2);
    }

    #[test]
    fn cumulative_and_prevalence_pass_states_through() {
        let sample = sample_with(&[15.0, 16.0, 17.0], |draw, t| {
            [900.0, 0.0, 5.0 * draw as f64, 1.0, 0.0, 100.0 * t as f64 + draw as f64]
        });
        let config = EstimatorConfig::default();
        let cumulative = cumulative_infections(&sample, &config).unwrap();
        assert!((cumulative.rows[2].median - 201.0).abs() < TOL);
        assert!((cumulative.rows[2].lower - 200.05).abs() < 1e-9);
        let prev = prevalence(&sample, &config).unwrap();
        assert!((prev.rows[0].median - 6.0).abs() < TOL);
    }

    #[test]
    fn missing_state_variable_is_validation_error() {
        let mut config = EstimatorConfig::default();
        config.state.exposed = "E2".into();
        let sample = sample_with(&[15.0], |_, _| [1.0; 6]);
        let err = rt(&sample, &config).unwrap_err();
        assert!(matches!(err, PhylopostError::Validation(_)));
        assert!(err.to_string().contains("E2"));
    }

    #[test]
    fn csv_output() {
        let sample = sample_with(&[15.0], |_, _| [900.0, 0.0, 50.0, 0.0, 50.0, 0.0]);
        let summary = prevalence(&sample, &EstimatorConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prevalence.csv");
        summary.write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time,date,median,lower,upper,n"));
        assert_eq!(lines.next(), Some("2020.0,2020-01-01,50.0,50.0,50.0,1"));
    }
}
