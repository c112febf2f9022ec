//! Options for loading, filtering and combining chains.

use phylopost_core::{PhylopostError, Result};
use serde::{Deserialize, Serialize};

/// Column names expected in raw chain outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Intra-chain sample identifier (iteration number), in both the
    /// parameter log and the trajectory table.
    pub sample: String,
    /// Log-posterior density in the parameter log.
    pub log_posterior: String,
    /// Time in the trajectory table.
    pub time: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            sample: "Sample".into(),
            log_posterior: "posterior".into(),
            time: "t".into(),
        }
    }
}

/// Every option of the combine stage, with its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// Leading fraction of each chain discarded as burn-in, in `[0, 1)`.
    pub burn_in: f64,
    /// Trajectories kept per retained chain.
    pub ntraj: usize,
    /// Pairwise mode: keep chains whose p-value exceeds this. Negative
    /// keeps every readable chain.
    pub p_threshold: f64,
    /// ANOVA mode: keep chains whose Tukey-adjusted p-value exceeds this.
    pub anova_alpha: f64,
    /// Seed for trajectory subsampling.
    pub seed: u64,
    pub columns: ColumnNames,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            burn_in: 0.5,
            ntraj: 200,
            p_threshold: 0.05,
            anova_alpha: 0.05,
            seed: 1,
            columns: ColumnNames::default(),
        }
    }
}

impl CombineConfig {
    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.burn_in) {
            return Err(PhylopostError::InvalidInput(format!(
                "burn_in must be in [0, 1), got {}",
                self.burn_in
            )));
        }
        if self.ntraj == 0 {
            return Err(PhylopostError::InvalidInput("ntraj must be positive".into()));
        }
        if !(self.anova_alpha > 0.0 && self.anova_alpha < 1.0) {
            return Err(PhylopostError::InvalidInput(format!(
                "anova_alpha must be in (0, 1), got {}",
                self.anova_alpha
            )));
        }
        if self.p_threshold.is_nan() || self.p_threshold >= 1.0 {
            return Err(PhylopostError::InvalidInput(format!(
                "p_threshold must be below 1, got {}",
                self.p_threshold
            )));
        }
        Ok(())
    }
}
