//! All estimators over one combined sample, restricted to a date window.

use phylopost_core::{PhylopostError, Result};
use phylopost_mcmc::CombinedSample;
use tracing::info;

use crate::config::EstimatorConfig;
use crate::estimate::{scalar_summaries, EpidemicScalars};
use crate::params::{summarize_parameters, ParameterSummary};
use crate::reporting::{reporting_rate, ReportedCases};
use crate::timeseries::{self, EpidemicSummary};
use crate::window::DateWindow;

/// Borrowed view of a combined sample with the options to estimate from it.
///
/// Every time-indexed result is restricted to the configured window before
/// it is returned.
#[derive(Debug, Clone, Copy)]
pub struct EpidemicEstimator<'a> {
    sample: &'a CombinedSample,
    config: &'a EstimatorConfig,
}

impl<'a> EpidemicEstimator<'a> {
    pub fn new(sample: &'a CombinedSample, config: &'a EstimatorConfig) -> Result<Self> {
        config.validate()?;
        if sample.draws().is_empty() {
            return Err(PhylopostError::Validation(
                "combined sample has no draws".into(),
            ));
        }
        Ok(Self { sample, config })
    }

    pub fn parameters(&self) -> Result<Vec<ParameterSummary>> {
        summarize_parameters(self.sample.draws(), self.config.interval)
    }

    pub fn scalars(&self) -> Result<EpidemicScalars> {
        scalar_summaries(self.sample.draws(), self.config)
    }

    pub fn rt(&self) -> Result<EpidemicSummary> {
        self.windowed(timeseries::rt(self.sample, self.config)?)
    }

    pub fn daily_infections(&self) -> Result<EpidemicSummary> {
        self.windowed(timeseries::daily_infections(self.sample, self.config)?)
    }

    pub fn cumulative_infections(&self) -> Result<EpidemicSummary> {
        self.windowed(timeseries::cumulative_infections(self.sample, self.config)?)
    }

    pub fn prevalence(&self) -> Result<EpidemicSummary> {
        self.windowed(timeseries::prevalence(self.sample, self.config)?)
    }

    pub fn reporting_rate(&self, reported: &ReportedCases) -> Result<EpidemicSummary> {
        self.windowed(reporting_rate(self.sample, reported, self.config)?)
    }

    /// Every time-indexed summary the sample supports, plus the reporting
    /// rate when reported cases are given.
    pub fn time_series(&self, reported: Option<&ReportedCases>) -> Result<Vec<EpidemicSummary>> {
        let mut out = vec![
            self.rt()?,
            self.daily_infections()?,
            self.cumulative_infections()?,
            self.prevalence()?,
        ];
        if let Some(reported) = reported {
            out.push(self.reporting_rate(reported)?);
        }
        Ok(out)
    }

    fn windowed(&self, summary: EpidemicSummary) -> Result<EpidemicSummary> {
        let max_time = self
            .sample
            .trajectories()
            .max_time()
            .ok_or_else(|| PhylopostError::Validation("combined sample has no trajectories".into()))?;
        let restricted = DateWindow::from_config(self.config).restrict(&summary, max_time)?;
        info!(
            quantity = %restricted.quantity,
            rows = restricted.len(),
            dropped = summary.len() - restricted.len(),
            "Estimated time series"
        );
        Ok(restricted)
    }
}
