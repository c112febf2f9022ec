//! Small combined samples for unit tests.

use phylopost_mcmc::{CombinedSample, Draw, DrawTable, SampleKey, Trajectory, TrajectoryTable};

pub(crate) const TIMES: [f64; 3] = [2020.0, 2020.1, 2020.2];

/// One draw per entry of `bs` (with `tau = 74`, `p_h = 0.2`), each with a
/// trajectory whose states `[S, E, Il, Ih, R, infections]` at time index
/// `t` are `state(draw, t)`.
pub(crate) fn sample_with(bs: &[f64], state: impl Fn(usize, usize) -> [f64; 6]) -> CombinedSample {
    let key = |i: usize| SampleKey {
        sample: i as u64 * 100,
        chain: 0,
    };
    let draws = bs
        .iter()
        .enumerate()
        .map(|(i, &b)| Draw {
            key: key(i),
            log_posterior: -1.0,
            values: vec![b, 74.0, 0.2],
        })
        .collect();
    let trajectories = (0..bs.len())
        .map(|i| {
            let rows: Vec<[f64; 6]> = (0..TIMES.len()).map(|t| state(i, t)).collect();
            Trajectory {
                key: key(i),
                times: TIMES.to_vec(),
                states: (0..6).map(|v| rows.iter().map(|r| r[v]).collect()).collect(),
            }
        })
        .collect();

    let draws = DrawTable::new(vec!["b".into(), "tau".into(), "p_h".into()], draws).unwrap();
    let variables = ["S", "E", "Il", "Ih", "R", "infections"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let trajectories = TrajectoryTable::new(variables, trajectories).unwrap();
    CombinedSample::new(draws, trajectories).unwrap()
}
