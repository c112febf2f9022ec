//! Options for the epidemiological estimators.

use chrono::NaiveDate;
use phylopost_core::{PhylopostError, Result};
use serde::{Deserialize, Serialize};

/// Names of the model parameters in the combined draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterNames {
    /// Transmission rate.
    pub b: String,
    /// Relative infectiousness of the high-transmission class.
    pub tau: String,
    /// Fraction of infections in the high-transmission class.
    pub p_h: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            b: "b".into(),
            tau: "tau".into(),
            p_h: "p_h".into(),
        }
    }
}

/// Values substituted when a draw lacks `tau` or `p_h`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterDefaults {
    pub tau: f64,
    pub p_h: f64,
}

impl Default for ParameterDefaults {
    fn default() -> Self {
        Self {
            tau: 74.0,
            p_h: 0.2,
        }
    }
}

/// Names of the state variables in the combined trajectories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateColumns {
    pub susceptible: String,
    pub exposed: String,
    pub infectious_low: String,
    pub infectious_high: String,
    pub recovered: String,
    /// Cumulative infections.
    pub cumulative: String,
}

impl Default for StateColumns {
    fn default() -> Self {
        Self {
            susceptible: "S".into(),
            exposed: "E".into(),
            infectious_low: "Il".into(),
            infectious_high: "Ih".into(),
            recovered: "R".into(),
            cumulative: "infections".into(),
        }
    }
}

/// Columns of a reported-cases table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportedColumns {
    pub date: String,
    /// Cumulative reported cases. Preferred when present.
    pub cumulative: String,
    /// Newly reported cases, summed when no cumulative column exists.
    pub incident: String,
}

impl Default for ReportedColumns {
    fn default() -> Self {
        Self {
            date: "date".into(),
            cumulative: "cumulative".into(),
            incident: "cases".into(),
        }
    }
}

/// Every option of the estimate stage, with its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Rate of leaving the exposed class, per year.
    pub gamma0: f64,
    /// Rate of leaving the infectious classes, per year.
    pub gamma1: f64,
    /// Coverage of the equal-tailed credible intervals.
    pub interval: f64,
    pub parameters: ParameterNames,
    pub defaults: ParameterDefaults,
    pub state: StateColumns,
    pub reported: ReportedColumns,
    /// First date reported by time-indexed summaries.
    pub start: Option<NaiveDate>,
    /// Last date reported; defaults to the end of the trajectories.
    pub end: Option<NaiveDate>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            gamma0: 73.0,
            gamma1: 121.667,
            interval: 0.95,
            parameters: ParameterNames::default(),
            defaults: ParameterDefaults::default(),
            state: StateColumns::default(),
            reported: ReportedColumns::default(),
            start: None,
            end: None,
        }
    }
}

impl EstimatorConfig {
    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [("gamma0", self.gamma0), ("gamma1", self.gamma1)] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(PhylopostError::InvalidInput(format!(
                    "{} must be positive, got {}",
                    name, rate
                )));
            }
        }
        if !(self.interval > 0.0 && self.interval < 1.0) {
            return Err(PhylopostError::InvalidInput(format!(
                "interval must be in (0, 1), got {}",
                self.interval
            )));
        }
        if !self.defaults.tau.is_finite() || !(0.0..=1.0).contains(&self.defaults.p_h) {
            return Err(PhylopostError::InvalidInput(format!(
                "invalid parameter defaults tau={} p_h={}",
                self.defaults.tau, self.defaults.p_h
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(PhylopostError::InvalidInput(format!(
                    "window start {} is after end {}",
                    start, end
                )));
            }
        }
        Ok(())
    }
}
