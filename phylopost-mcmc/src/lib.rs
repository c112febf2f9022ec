//! Combining replicated MCMC chains into one posterior sample.
//!
//! - **Chains**: parameter traces and simulated trajectories ([`chain`])
//! - **Loading**: reading raw outputs and removing burn-in ([`loader`])
//! - **Convergence filtering**: ANOVA ranking or ESS-adjusted pairwise
//!   tests against the best chain ([`filter`])
//! - **Joining**: unique sample keys and seeded trajectory subsampling
//!   ([`joiner`], [`sample`])
//! - **Pipelines**: `combine_logs` and `combine_logs_and_trajectories`
//!   ([`pipeline`])

pub mod chain;
pub mod config;
pub mod filter;
pub mod joiner;
pub mod loader;
pub mod pipeline;
pub mod sample;

#[cfg(test)]
mod test_support;

pub use chain::{Chain, Draw, ParameterTrace, Trajectory, TrajectorySet};
pub use config::{ColumnNames, CombineConfig};
pub use filter::{AnovaRanking, ChainVerdict, ConvergenceFilter, Decision, PairwiseEss, Selection};
pub use joiner::{combine_draws, combine_paired, SampleKey, TrajectorySampler};
pub use loader::{load_chain, load_chains, ChainSource, LoadFailure, LoadedBatch};
pub use pipeline::{
    combine_chains, combine_logs, combine_logs_and_trajectories, CombineOutput, CombineReport,
};
pub use sample::{CombinedSample, DrawTable, TrajectoryTable};
