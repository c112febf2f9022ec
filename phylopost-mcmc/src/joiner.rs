//! Joining retained chains into one combined sample.
//!
//! Intra-chain sample ids repeat across chains, so every draw and
//! trajectory is relabelled with a [`SampleKey`] that also carries the
//! chain's position in the input list. A trajectory keeps the key of the
//! draw that produced it.

use std::collections::HashSet;
use std::fmt;

use phylopost_core::{PhylopostError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chain::{Chain, Draw, Trajectory};
use crate::sample::{CombinedSample, DrawTable, TrajectoryTable};

/// Globally unique key of a combined draw: the chain's own sample id plus
/// the chain's input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleKey {
    pub sample: u64,
    pub chain: usize,
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sample, self.chain)
    }
}

impl SampleKey {
    fn of(chain: &Chain, sample: u64) -> Self {
        Self {
            sample,
            chain: chain.index,
        }
    }
}

/// Concatenate the draws of `chains[order[0]], chains[order[1]], ...`.
///
/// Every chain must log the same parameters in the same order.
pub fn combine_draws(chains: &[Chain], order: &[usize]) -> Result<DrawTable> {
    let selected = selected(chains, order)?;
    let parameters = match selected.first() {
        Some(chain) => chain.trace.parameters.clone(),
        None => Vec::new(),
    };

    let mut draws = Vec::with_capacity(selected.iter().map(|c| c.trace.len()).sum());
    for chain in selected {
        if chain.trace.parameters != parameters {
            return Err(PhylopostError::Validation(format!(
                "{}: parameters [{}] differ from [{}]",
                chain.source,
                chain.trace.parameters.join(", "),
                parameters.join(", ")
            )));
        }
        draws.extend(chain.trace.draws.iter().map(|d| Draw {
            key: SampleKey::of(chain, d.key),
            log_posterior: d.log_posterior,
            values: d.values.clone(),
        }));
    }
    DrawTable::new(parameters, draws)
}

/// Seeded uniform subsampling of each chain's trajectories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajectorySampler {
    /// Trajectories kept per chain (fewer when a chain has fewer).
    pub ntraj: usize,
    pub seed: u64,
}

impl TrajectorySampler {
    pub fn new(ntraj: usize, seed: u64) -> Self {
        Self { ntraj, seed }
    }

    /// Generator for one chain. Depends only on the seed and the chain's
    /// input position, so chains can be sampled in any order.
    fn rng_for(&self, chain: &Chain) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(chain.index as u64))
    }

    /// Sample `min(ntraj, n)` of `trajectories` without replacement,
    /// returned in their original order.
    pub fn sample<'a>(
        &self,
        chain: &Chain,
        trajectories: &'a [Trajectory],
    ) -> Vec<&'a Trajectory> {
        let amount = self.ntraj.min(trajectories.len());
        let mut rng = self.rng_for(chain);
        let mut picked = rand::seq::index::sample(&mut rng, trajectories.len(), amount).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| &trajectories[i]).collect()
    }
}

/// Combine draws and subsampled trajectories of the chains in `order`.
///
/// Trajectories whose sample id has no draw in the same chain (for example
/// because burn-in removed it) are dropped before subsampling. Every chain
/// in `order` must carry trajectories with the same state variables.
pub fn combine_paired(
    chains: &[Chain],
    order: &[usize],
    sampler: &TrajectorySampler,
) -> Result<CombinedSample> {
    let draws = combine_draws(chains, order)?;

    let mut variables: Option<&[String]> = None;
    let mut trajectories = Vec::new();
    for chain in selected(chains, order)? {
        let set = chain.trajectories.as_ref().ok_or_else(|| {
            PhylopostError::Validation(format!("{}: chain has no trajectories", chain.source))
        })?;
        match variables {
            None => variables = Some(set.variables.as_slice()),
            Some(v) if v != set.variables.as_slice() => {
                return Err(PhylopostError::Validation(format!(
                    "{}: state variables [{}] differ from [{}]",
                    chain.source,
                    set.variables.join(", "),
                    v.join(", ")
                )));
            }
            Some(_) => {}
        }

        let ids: HashSet<u64> = chain.trace.draws.iter().map(|d| d.key).collect();
        let paired: Vec<Trajectory> = set
            .trajectories
            .iter()
            .filter(|t| ids.contains(&t.key))
            .cloned()
            .collect();
        let orphans = set.len() - paired.len();
        if orphans > 0 {
            warn!(
                chain = chain.index,
                source = %chain.source,
                orphans,
                "Dropped trajectories without a matching draw"
            );
        }

        let picked = sampler.sample(chain, &paired);
        debug!(
            chain = chain.index,
            available = paired.len(),
            kept = picked.len(),
            "Subsampled trajectories"
        );
        trajectories.extend(picked.into_iter().map(|t| Trajectory {
            key: SampleKey::of(chain, t.key),
            times: t.times.clone(),
            states: t.states.clone(),
        }));
    }

    let variables = variables.map(<[String]>::to_vec).unwrap_or_default();
    let table = TrajectoryTable::new(variables, trajectories)?;
    CombinedSample::new(draws, table)
}

fn selected<'a>(chains: &'a [Chain], order: &[usize]) -> Result<Vec<&'a Chain>> {
    order
        .iter()
        .map(|&i| {
            chains.get(i).ok_or_else(|| {
                PhylopostError::InvalidInput(format!(
                    "chain position {} out of range for {} chains",
                    i,
                    chains.len()
                ))
            })
        })
        .collect()
}
