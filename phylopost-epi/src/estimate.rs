//! Per-draw epidemic quantities summarized across the posterior.
//!
//! For a draw with transmission rate `b`, high-transmission fraction `p_h`
//! and relative infectiousness `tau`, with fixed rates `γ0` (leaving the
//! exposed class) and `γ1` (leaving the infectious classes), per year:
//!
//! ```text
//! R = (1 - p_h)·b/γ1 + τ·p_h·b/γ1
//! β = (1 - p_h)·b + p_h·τ·b
//! r = (-(γ0 + γ1) + sqrt((γ0 - γ1)² + 4·γ0·β)) / 2
//! ```
//!
//! Growth rate is reported per day (`r / 365`) and doubling time in days.

use std::f64::consts::LN_2;

use phylopost_core::{PhylopostError, Result, Summarizable};
use phylopost_mcmc::DrawTable;
use phylopost_stats::{credible_interval, Interval};
use serde::Serialize;

use crate::config::EstimatorConfig;
use crate::params::{model_params, ModelParams};

/// Days per year used to convert yearly rates.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Basic reproduction number of one draw.
pub fn reproduction_number(p: &ModelParams, gamma1: f64) -> f64 {
    (1.0 - p.p_h) * p.b / gamma1 + p.tau * p.p_h * p.b / gamma1
}

/// Exponential growth rate of one draw, per day.
pub fn growth_rate(p: &ModelParams, gamma0: f64, gamma1: f64) -> f64 {
    let beta = (1.0 - p.p_h) * p.b + p.p_h * p.tau * p.b;
    let disc = (gamma0 - gamma1).powi(2) + 4.0 * gamma0 * beta;
    let r = (-(gamma0 + gamma1) + disc.sqrt()) / 2.0;
    r / DAYS_PER_YEAR
}

/// Doubling time in days for a daily growth rate. Undefined (`None`) unless
/// the epidemic grows.
pub fn doubling_time(growth_per_day: f64) -> Option<f64> {
    (growth_per_day > 0.0).then(|| LN_2 / growth_per_day)
}

/// Summary of a quantity over draws, ignoring draws where it is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalarSummary {
    /// `None` when no draw has a defined value.
    #[serde(flatten)]
    pub interval: Option<Interval>,
    /// Draws with a defined value.
    pub n: usize,
    /// Draws where the quantity is undefined (non-finite).
    pub n_missing: usize,
}

impl ScalarSummary {
    /// Summarize `values`, skipping non-finite entries.
    pub fn from_values(values: &[f64], level: f64) -> Result<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let interval = if finite.is_empty() {
            None
        } else {
            Some(credible_interval(&finite, level)?)
        };
        Ok(Self {
            interval,
            n: finite.len(),
            n_missing: values.len() - finite.len(),
        })
    }
}

impl Summarizable for ScalarSummary {
    fn summary(&self) -> String {
        match &self.interval {
            Some(i) if self.n_missing > 0 => {
                format!("{} ({} undefined)", i.summary(), self.n_missing)
            }
            Some(i) => i.summary(),
            None => format!("undefined for all {} draws", self.n_missing),
        }
    }
}

/// Reproduction number, growth rate and doubling time over the posterior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpidemicScalars {
    pub reproduction_number: ScalarSummary,
    pub growth_rate: ScalarSummary,
    pub doubling_time: ScalarSummary,
}

impl Summarizable for EpidemicScalars {
    fn summary(&self) -> String {
        format!(
            "R = {}; growth rate = {} /day; doubling time = {} days",
            self.reproduction_number.summary(),
            self.growth_rate.summary(),
            self.doubling_time.summary()
        )
    }
}

/// Compute the scalar quantities per draw, then summarize each.
pub fn scalar_summaries(draws: &DrawTable, config: &EstimatorConfig) -> Result<EpidemicScalars> {
    config.validate()?;
    if draws.is_empty() {
        return Err(PhylopostError::Validation("no draws to summarize".into()));
    }
    let params = model_params(draws, config)?;
    let r0: Vec<f64> = params
        .iter()
        .map(|p| reproduction_number(p, config.gamma1))
        .collect();
    let growth: Vec<f64> = params
        .iter()
        .map(|p| growth_rate(p, config.gamma0, config.gamma1))
        .collect();
    let doubling: Vec<f64> = growth
        .iter()
        .map(|&r| doubling_time(r).unwrap_or(f64::NAN))
        .collect();

    Ok(EpidemicScalars {
        reproduction_number: ScalarSummary::from_values(&r0, config.interval)?,
        growth_rate: ScalarSummary::from_values(&growth, config.interval)?,
        doubling_time: ScalarSummary::from_values(&doubling, config.interval)?,
    })
}
