//! Synthetic chains shared by unit tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::chain::{Chain, Draw, ParameterTrace, Trajectory, TrajectorySet};

/// Seeded uniform noise on `[-0.5, 0.5)`.
pub(crate) fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random::<f64>() - 0.5).collect()
}

/// The same values in a seeded random order.
pub(crate) fn shuffled(values: &[f64], seed: u64) -> Vec<f64> {
    let mut out = values.to_vec();
    out.shuffle(&mut StdRng::seed_from_u64(seed));
    out
}

/// AR(1) series driven by [`noise`].
pub(crate) fn ar1(n: usize, seed: u64, phi: f64) -> Vec<f64> {
    let mut prev = 0.0;
    noise(n, seed)
        .into_iter()
        .map(|e| {
            prev = phi * prev + e;
            prev
        })
        .collect()
}

/// A chain named `chain{index}` with sample ids `0, 10, 20, ...` and one
/// parameter `b`.
pub(crate) fn chain_from_log_posteriors(index: usize, lp: &[f64]) -> Chain {
    Chain {
        index,
        source: format!("chain{}", index),
        trace: ParameterTrace {
            parameters: vec!["b".into()],
            draws: lp
                .iter()
                .enumerate()
                .map(|(k, &log_posterior)| Draw {
                    key: k as u64 * 10,
                    log_posterior,
                    values: vec![15.0 + index as f64],
                })
                .collect(),
        },
        trajectories: None,
    }
}

/// Attach one trajectory per draw, with a shared three-point time axis.
pub(crate) fn with_trajectories(mut chain: Chain) -> Chain {
    let trajectories = chain
        .trace
        .draws
        .iter()
        .map(|d| Trajectory {
            key: d.key,
            times: vec![2020.0, 2020.1, 2020.2],
            states: vec![vec![d.key as f64, 1.0, 2.0]],
        })
        .collect();
    chain.trajectories = Some(TrajectorySet {
        variables: vec!["S".into()],
        trajectories,
    });
    chain
}

/// Two agreeing chains around -1000 and a third shifted down by 3 with
/// strong autocorrelation (ESS in the tens of 400 draws).
///
/// The second chain replays the first chain's draws in shuffled order, 0.01
/// lower, so the first chain always has the highest median while the two
/// stay statistically indistinguishable.
pub(crate) fn scenario() -> Vec<Chain> {
    let shifted = |v: Vec<f64>, by: f64| v.into_iter().map(|x| x + by).collect::<Vec<_>>();
    let base = noise(400, 11);
    vec![
        chain_from_log_posteriors(0, &shifted(base.clone(), -1000.0)),
        chain_from_log_posteriors(1, &shifted(shuffled(&base, 12), -1000.01)),
        chain_from_log_posteriors(2, &shifted(ar1(400, 13, 0.9), -1003.0)),
    ]
}
