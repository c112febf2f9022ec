//! Statistical methods for the phylopost workspace.
//!
//! - **Descriptive statistics**: mean, median, variance, quantiles, credible intervals
//! - **Distributions**: Normal, Student t, F, studentized range
//! - **Hypothesis testing**: one-way ANOVA, Tukey HSD, ESS-adjusted two-sample t-test
//! - **MCMC diagnostics**: autocorrelation and effective sample size

pub mod descriptive;
pub mod diagnostics;
pub mod distribution;
pub mod testing;

pub use descriptive::{credible_interval, describe, Interval, TraceStats};
pub use diagnostics::effective_sample_size;
pub use testing::{anova_oneway, ess_t_test, AnovaFit, TestResult, TukeyComparison};
