//! End-to-end combination: load, filter, join.

use std::fmt;
use std::path::Path;

use phylopost_core::{PhylopostError, Result, Summarizable};
use tracing::info;

use crate::config::CombineConfig;
use crate::filter::{AnovaRanking, ChainVerdict, ConvergenceFilter, Decision, PairwiseEss};
use crate::joiner::{combine_draws, combine_paired, TrajectorySampler};
use crate::loader::{load_chains, ChainSource, LoadedBatch};
use crate::sample::CombinedSample;

/// Which chains were combined, which were dropped, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct CombineReport {
    /// Name of the convergence filter that ran.
    pub filter: &'static str,
    /// One verdict per input chain, in input order, load failures included.
    pub verdicts: Vec<ChainVerdict>,
    pub draws: usize,
    pub trajectories: usize,
}

impl CombineReport {
    pub fn kept(&self) -> impl Iterator<Item = &ChainVerdict> {
        self.verdicts.iter().filter(|v| v.decision.is_kept())
    }

    pub fn dropped(&self) -> impl Iterator<Item = &ChainVerdict> {
        self.verdicts.iter().filter(|v| !v.decision.is_kept())
    }
}

impl Summarizable for CombineReport {
    fn summary(&self) -> String {
        format!(
            "{}: kept {} of {} chains, {} draws, {} trajectories",
            self.filter,
            self.kept().count(),
            self.verdicts.len(),
            self.draws,
            self.trajectories
        )
    }
}

impl fmt::Display for CombineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for v in &self.verdicts {
            write!(f, "  [{}] {}", v.index, v.source)?;
            if let Some(rank) = v.rank {
                write!(f, "  rank={}", rank)?;
            }
            if let Some(median) = v.median_log_posterior {
                write!(f, "  median={:.3}", median)?;
            }
            if let Some(ess) = v.ess {
                write!(f, "  ess={:.1}", ess)?;
            }
            if let Some(p) = v.p_value {
                write!(f, "  p={:.4}", p)?;
            }
            writeln!(f, "  {}", v.decision)?;
        }
        Ok(())
    }
}

/// A combined sample with its report.
#[derive(Debug, Clone)]
pub struct CombineOutput {
    pub sample: CombinedSample,
    pub report: CombineReport,
}

/// Filter a loaded batch and join the retained chains.
///
/// With a sampler, trajectories are subsampled and paired with their draws;
/// without one, only draws are combined.
pub fn combine_chains(
    batch: &LoadedBatch,
    filter: &dyn ConvergenceFilter,
    sampler: Option<&TrajectorySampler>,
) -> Result<CombineOutput> {
    if batch.chains.is_empty() {
        return Err(PhylopostError::Validation(format!(
            "no usable chains ({} failed to load)",
            batch.failures.len()
        )));
    }
    let selection = filter.select(&batch.chains)?;

    let sample = match sampler {
        Some(sampler) => combine_paired(&batch.chains, &selection.kept, sampler)?,
        None => CombinedSample::draws_only(combine_draws(&batch.chains, &selection.kept)?),
    };

    let mut verdicts = selection.verdicts;
    verdicts.extend(batch.failures.iter().map(|failure| ChainVerdict {
        index: failure.index,
        source: failure.source.clone(),
        rank: None,
        median_log_posterior: None,
        ess: None,
        p_value: Some(f64::NEG_INFINITY),
        decision: Decision::LoadFailed(failure.reason.clone()),
    }));
    verdicts.sort_by_key(|v| v.index);

    let report = CombineReport {
        filter: filter.name(),
        verdicts,
        draws: sample.draws().len(),
        trajectories: sample.trajectories().len(),
    };
    info!(
        filter = report.filter,
        kept = report.kept().count(),
        dropped = report.dropped().count(),
        draws = report.draws,
        trajectories = report.trajectories,
        "Combined chains"
    );
    Ok(CombineOutput { sample, report })
}

/// Combine parameter logs only, filtering with ANOVA and Tukey HSD.
pub fn combine_logs<P: AsRef<Path>>(logs: &[P], config: &CombineConfig) -> Result<CombineOutput> {
    let sources: Vec<ChainSource> = logs
        .iter()
        .map(|p| ChainSource::log(p.as_ref()))
        .collect();
    let batch = load_chains(&sources, config)?;
    let filter = AnovaRanking {
        alpha: config.anova_alpha,
    };
    combine_chains(&batch, &filter, None)
}

/// Combine parameter logs with their trajectory tables, filtering with the
/// ESS-adjusted pairwise test. `logs[i]` pairs with `trajectories[i]`.
pub fn combine_logs_and_trajectories<P: AsRef<Path>, Q: AsRef<Path>>(
    logs: &[P],
    trajectories: &[Q],
    config: &CombineConfig,
) -> Result<CombineOutput> {
    if logs.len() != trajectories.len() {
        return Err(PhylopostError::Validation(format!(
            "{} parameter logs but {} trajectory files",
            logs.len(),
            trajectories.len()
        )));
    }
    let sources: Vec<ChainSource> = logs
        .iter()
        .zip(trajectories)
        .map(|(log, traj)| ChainSource::paired(log.as_ref(), traj.as_ref()))
        .collect();
    let batch = load_chains(&sources, config)?;
    let filter = PairwiseEss {
        p_threshold: config.p_threshold,
    };
    let sampler = TrajectorySampler::new(config.ntraj, config.seed);
    combine_chains(&batch, &filter, Some(&sampler))
}
