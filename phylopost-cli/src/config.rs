//! The TOML configuration file: one section per pipeline stage.

use std::path::Path;

use anyhow::{Context, Result};
use phylopost_epi::EstimatorConfig;
use phylopost_mcmc::CombineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub combine: CombineConfig,
    pub estimate: EstimatorConfig,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// The file at `path`, or every default when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.combine.validate().context("Invalid [combine] section")?;
        self.estimate.validate().context("Invalid [estimate] section")?;
        Ok(())
    }
}

pub const EXAMPLE: &str = r#"# phylopost configuration file

[combine]
# Leading fraction of every chain discarded as burn-in
burn_in = 0.5
# Trajectories kept per retained chain
ntraj = 200
# Pairwise mode (logs with trajectories): drop chains with p <= p_threshold.
# A negative value keeps every readable chain.
p_threshold = 0.05
# ANOVA mode (logs only): drop chains with Tukey-adjusted p <= anova_alpha
anova_alpha = 0.05
seed = 1

[combine.columns]
sample = "Sample"
log_posterior = "posterior"
time = "t"

[estimate]
# Rates per year: leaving the exposed class, leaving the infectious classes
gamma0 = 73.0
gamma1 = 121.667
interval = 0.95
# Reporting window; the end defaults to the last trajectory time
# start = "2020-02-01"
# end = "2020-04-30"

[estimate.parameters]
b = "b"
tau = "tau"
p_h = "p_h"

# Used when a draw has no value for tau or p_h
[estimate.defaults]
tau = 74.0
p_h = 0.2

[estimate.state]
susceptible = "S"
exposed = "E"
infectious_low = "Il"
infectious_high = "Ih"
recovered = "R"
cumulative = "infections"

[estimate.reported]
date = "date"
cumulative = "cumulative"
incident = "cases"
"#;
