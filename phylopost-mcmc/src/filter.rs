//! Convergence filtering: deciding which chains sampled the same posterior.
//!
//! Independent chains can settle in different modes of a multimodal
//! posterior. Both filters compare the chains' log-posterior densities and
//! discard the chains that differ significantly from the reference chain
//! (the one with the highest median log posterior):
//!
//! - [`AnovaRanking`] fits one ANOVA over all chains and keeps chains whose
//!   Tukey HSD comparison with the reference is not significant. Kept chains
//!   are returned in ranked order.
//! - [`PairwiseEss`] tests each chain against the reference alone with the
//!   ESS-adjusted two-sample t-test. Kept chains stay in input order.
//!
//! Filters never mutate chains; they return positions into the input slice.

use std::fmt;

use phylopost_core::{Annotated, PhylopostError, Result};
use phylopost_stats::descriptive::median;
use phylopost_stats::{anova_oneway, effective_sample_size, ess_t_test};
use tracing::{debug, info};

use crate::chain::Chain;

/// Why a chain was kept or dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The chain every other chain was compared against.
    Reference,
    /// Not significantly different from the reference.
    Kept,
    /// Significantly different from the reference.
    Diverged,
    /// The chain's source could not be read.
    LoadFailed(String),
}

impl Decision {
    /// Whether the chain enters the combined sample.
    pub fn is_kept(&self) -> bool {
        matches!(self, Decision::Reference | Decision::Kept)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Reference => write!(f, "kept (reference)"),
            Decision::Kept => write!(f, "kept"),
            Decision::Diverged => write!(f, "dropped (diverged)"),
            Decision::LoadFailed(reason) => write!(f, "dropped (load failed: {})", reason),
        }
    }
}

/// The filter's finding for one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainVerdict {
    pub index: usize,
    pub source: String,
    /// 1-based rank by median log posterior, highest first.
    pub rank: Option<usize>,
    pub median_log_posterior: Option<f64>,
    pub ess: Option<f64>,
    /// p-value of the comparison with the reference. `None` when no test
    /// ran, negative infinity for chains that failed to load.
    pub p_value: Option<f64>,
    pub decision: Decision,
}

/// Chains selected for combination.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Positions into the filtered slice, in combination order.
    pub kept: Vec<usize>,
    /// One verdict per input chain, in input order.
    pub verdicts: Vec<ChainVerdict>,
}

/// Selects the chains that may be pooled.
pub trait ConvergenceFilter {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Choose the keep-set among `chains`.
    ///
    /// A single chain is kept without testing. An empty slice is a
    /// [`PhylopostError::Validation`] error.
    fn select(&self, chains: &[Chain]) -> Result<Selection>;
}

/// Omnibus one-way ANOVA with Tukey HSD comparisons against the top chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnovaRanking {
    /// Chains whose adjusted p-value is at most `alpha` are dropped.
    pub alpha: f64,
}

impl Default for AnovaRanking {
    fn default() -> Self {
        Self { alpha: 0.05 }
    }
}

impl ConvergenceFilter for AnovaRanking {
    fn name(&self) -> &'static str {
        "anova"
    }

    fn select(&self, chains: &[Chain]) -> Result<Selection> {
        let medians = medians(chains)?;
        let order = ranking(&medians);
        let mut verdicts = initial_verdicts(chains, &medians, &order);
        for (verdict, chain) in verdicts.iter_mut().zip(chains) {
            // Reported only; the ANOVA itself does not use it.
            verdict.ess = effective_sample_size(&chain.trace.log_posteriors()).ok();
        }

        let reference = order[0];
        verdicts[reference].decision = Decision::Reference;
        if chains.len() == 1 {
            return Ok(Selection {
                kept: vec![reference],
                verdicts,
            });
        }

        let traces: Vec<Vec<f64>> = chains.iter().map(|c| c.trace.log_posteriors()).collect();
        let groups: Vec<&[f64]> = traces.iter().map(Vec::as_slice).collect();
        let fit = anova_oneway(&groups)
            .map_err(|e| e.context(format!("ANOVA across {} chains", chains.len())))?;
        debug!(
            f = fit.test.statistic,
            p = fit.test.p_value,
            "Fitted one-way ANOVA on log posterior"
        );
        let comparisons = fit
            .tukey_vs(reference)
            .map_err(|e| e.context(format!("Tukey HSD against {}", chains[reference].source)))?;

        for cmp in comparisons.iter().filter(|c| c.group != reference) {
            let verdict = &mut verdicts[cmp.group];
            verdict.p_value = Some(cmp.p_adjusted);
            verdict.decision = if cmp.p_adjusted > self.alpha {
                Decision::Kept
            } else {
                Decision::Diverged
            };
        }
        verdicts[reference].p_value = Some(1.0);

        let kept = order
            .into_iter()
            .filter(|&i| verdicts[i].decision.is_kept())
            .collect();
        log_verdicts(self.name(), &verdicts);
        Ok(Selection { kept, verdicts })
    }
}

/// Per-chain ESS-adjusted t-test against the top chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseEss {
    /// Chains whose p-value is at most the threshold are dropped. A
    /// negative threshold keeps every chain without testing.
    pub p_threshold: f64,
}

impl Default for PairwiseEss {
    fn default() -> Self {
        Self { p_threshold: 0.05 }
    }
}

impl ConvergenceFilter for PairwiseEss {
    fn name(&self) -> &'static str {
        "pairwise-ess"
    }

    fn select(&self, chains: &[Chain]) -> Result<Selection> {
        let medians = medians(chains)?;
        let order = ranking(&medians);
        let mut verdicts = initial_verdicts(chains, &medians, &order);
        let reference = order[0];
        verdicts[reference].decision = Decision::Reference;

        if chains.len() == 1 || self.p_threshold < 0.0 {
            for verdict in verdicts.iter_mut().filter(|v| v.decision != Decision::Reference) {
                verdict.decision = Decision::Kept;
            }
            return Ok(Selection {
                kept: (0..chains.len()).collect(),
                verdicts,
            });
        }

        let traces: Vec<Vec<f64>> = chains.iter().map(|c| c.trace.log_posteriors()).collect();
        let ess: Vec<f64> = chains
            .iter()
            .zip(&traces)
            .map(|(chain, trace)| effective_sample_size(trace).map_err(|e| e.context(chain.name())))
            .collect::<Result<_>>()?;

        for k in 0..chains.len() {
            let p = if k == reference {
                1.0
            } else {
                ess_t_test(&traces[reference], &traces[k], ess[reference], ess[k])
                    .map_err(|e| {
                        e.context(format!(
                            "{} against {}",
                            chains[k].source, chains[reference].source
                        ))
                    })?
                    .p_value
            };
            let verdict = &mut verdicts[k];
            verdict.ess = Some(ess[k]);
            verdict.p_value = Some(p);
            if k != reference {
                verdict.decision = if p > self.p_threshold {
                    Decision::Kept
                } else {
                    Decision::Diverged
                };
            }
        }

        let kept = (0..chains.len())
            .filter(|&i| verdicts[i].decision.is_kept())
            .collect();
        log_verdicts(self.name(), &verdicts);
        Ok(Selection { kept, verdicts })
    }
}

fn medians(chains: &[Chain]) -> Result<Vec<f64>> {
    if chains.is_empty() {
        return Err(PhylopostError::Validation(
            "no usable chains to combine".into(),
        ));
    }
    chains
        .iter()
        .map(|c| median(&c.trace.log_posteriors()).map_err(|e| e.context(c.name())))
        .collect()
}

/// Positions sorted by descending median. The sort is stable: equal medians
/// keep input order, so ties depend on how the caller ordered the chains.
fn ranking(medians: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..medians.len()).collect();
    order.sort_by(|&a, &b| medians[b].total_cmp(&medians[a]));
    order
}

fn initial_verdicts(chains: &[Chain], medians: &[f64], order: &[usize]) -> Vec<ChainVerdict> {
    let mut rank = vec![0; chains.len()];
    for (r, &i) in order.iter().enumerate() {
        rank[i] = r + 1;
    }
    chains
        .iter()
        .zip(medians)
        .enumerate()
        .map(|(i, (chain, &m))| ChainVerdict {
            index: chain.index,
            source: chain.source.clone(),
            rank: Some(rank[i]),
            median_log_posterior: Some(m),
            ess: None,
            p_value: None,
            decision: Decision::Kept,
        })
        .collect()
}

fn log_verdicts(filter: &str, verdicts: &[ChainVerdict]) {
    for v in verdicts {
        info!(
            filter,
            chain = v.index,
            source = %v.source,
            rank = v.rank,
            median = v.median_log_posterior,
            ess = v.ess,
            p = v.p_value,
            decision = %v.decision,
            "Convergence verdict"
        );
    }
}
