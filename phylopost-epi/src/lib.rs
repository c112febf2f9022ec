//! Epidemiological estimators over a combined phylodynamic posterior.
//!
//! - **Scalar quantities**: reproduction number, growth rate, doubling
//!   time ([`estimate`])
//! - **Time series**: R(t), daily and cumulative infections, prevalence
//!   ([`timeseries`])
//! - **Reporting rate**: reported over estimated cumulative cases
//!   ([`reporting`])
//! - **Windows and dates**: decimal-year times, calendar windows
//!   ([`dates`], [`window`])
//!
//! [`EpidemicEstimator`] runs them all over one [`CombinedSample`](phylopost_mcmc::CombinedSample).

pub mod config;
pub mod dates;
pub mod estimate;
pub mod estimator;
pub mod params;
pub mod reporting;
pub mod timeseries;
pub mod window;

#[cfg(test)]
mod test_support;

pub use config::{EstimatorConfig, ParameterDefaults, ParameterNames, ReportedColumns, StateColumns};
pub use dates::{date_to_decimal_year, decimal_year_to_date};
pub use estimate::{
    doubling_time, growth_rate, reproduction_number, scalar_summaries, EpidemicScalars,
    ScalarSummary,
};
pub use estimator::EpidemicEstimator;
pub use params::{model_params, summarize_parameters, ModelParams, ParamColumns, ParameterSummary};
pub use reporting::{reporting_rate, ReportedCases};
pub use timeseries::{
    cumulative_infections, daily_infections, prevalence, rt, EpidemicSummary, SummaryRow,
};
pub use window::DateWindow;
