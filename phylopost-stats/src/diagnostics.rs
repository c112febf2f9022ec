//! MCMC convergence diagnostics for a single chain.

use phylopost_core::{PhylopostError, Result};

/// Lag-`lag` autocorrelation of `values` (biased estimator, normalized by
/// the lag-0 autocovariance).
pub fn autocorrelation(values: &[f64], lag: usize) -> Result<f64> {
    let n = values.len();
    if lag >= n {
        return Err(PhylopostError::InvalidInput(format!(
            "autocorrelation: lag {} out of range for {} values",
            lag, n
        )));
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var: f64 = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if var < 1e-30 {
        return Err(PhylopostError::Degenerate(
            "autocorrelation: trace has zero variance".into(),
        ));
    }
    Ok(lagged_covariance(values, mean, lag) / (n as f64 * var))
}

/// Effective sample size via autocorrelation.
///
/// `ESS = n / (1 + 2 Σ ρ_k)`, summing lags until the first negative
/// autocorrelation or lag `n / 2`, whichever comes first. Estimates at
/// longer lags rest on fewer than half the pairs and are mostly noise.
///
/// A trace that is constant or shorter than two draws has no defined ESS and
/// is reported as [`PhylopostError::Degenerate`].
pub fn effective_sample_size(values: &[f64]) -> Result<f64> {
    let n = values.len();
    if n < 2 {
        return Err(PhylopostError::Degenerate(format!(
            "effective_sample_size: need at least 2 values (got {})",
            n
        )));
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let var: f64 = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if !var.is_finite() {
        return Err(PhylopostError::InvalidInput(
            "effective_sample_size: trace contains non-finite values".into(),
        ));
    }
    if var < 1e-30 {
        return Err(PhylopostError::Degenerate(
            "effective_sample_size: trace has zero variance".into(),
        ));
    }

    let mut sum_rho = 0.0;
    for lag in 1..=max_lag(n) {
        let rho = lagged_covariance(values, mean, lag) / (n as f64 * var);
        if rho < 0.0 {
            break;
        }
        sum_rho += rho;
    }

    Ok(n as f64 / (1.0 + 2.0 * sum_rho))
}

fn max_lag(n: usize) -> usize {
    (n / 2).max(1)
}

fn lagged_covariance(values: &[f64], mean: f64, lag: usize) -> f64 {
    values
        .iter()
        .zip(&values[lag..])
        .map(|(&a, &b)| (a - mean) * (b - mean))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.random::<f64>()).collect()
    }

    fn ar1(n: usize, phi: f64, seed: u64) -> Vec<f64> {
        let noise = uniform(n, seed);
        let mut x = 0.0;
        noise
            .into_iter()
            .map(|e| {
                x = phi * x + (e - 0.5);
                x
            })
            .collect()
    }

    #[test]
    fn ess_near_n_for_independent_draws() {
        let values = uniform(2000, 7);
        let ess = effective_sample_size(&values).unwrap();
        assert!(ess > 1000.0 && ess <= 2000.0, "ess = {}", ess);
    }

    #[test]
    fn ess_small_for_sticky_chain() {
        let values = ar1(2000, 0.95, 11);
        let ess = effective_sample_size(&values).unwrap();
        assert!(ess < 300.0, "ess = {}", ess);
        assert!(ess > 0.0);
    }

    #[test]
    fn ess_constant_trace_is_degenerate() {
        let err = effective_sample_size(&[3.0; 50]).unwrap_err();
        assert!(matches!(err, PhylopostError::Degenerate(_)));
    }

    #[test]
    fn ess_single_draw_is_degenerate() {
        let err = effective_sample_size(&[1.0]).unwrap_err();
        assert!(matches!(err, PhylopostError::Degenerate(_)));
        assert!(matches!(
            effective_sample_size(&[]).unwrap_err(),
            PhylopostError::Degenerate(_)
        ));
    }

    #[test]
    fn ess_matches_truncated_autocorrelation_sum() {
        // Two plateaus: positive autocorrelation up to about lag n/3.
        let values: Vec<f64> = (0..400).map(|i| if i < 200 { 0.0 } else { 1.0 }).collect();
        let n = values.len();
        let mut expected = 0.0;
        for lag in 1..=n / 2 {
            let rho = autocorrelation(&values, lag).unwrap();
            if rho < 0.0 {
                break;
            }
            expected += rho;
        }
        let ess = effective_sample_size(&values).unwrap();
        assert!((ess - n as f64 / (1.0 + 2.0 * expected)).abs() < 1e-9);
        assert!((ess - 3.0).abs() < 1e-3, "ess = {}", ess);
    }

    #[test]
    fn ess_long_random_walk_finishes() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut x = 0.0;
        let walk: Vec<f64> = (0..20_000)
            .map(|_| {
                x += rng.random::<f64>() - 0.5;
                x
            })
            .collect();
        let ess = effective_sample_size(&walk).unwrap();
        assert!(ess.is_finite() && ess > 0.0 && ess < 2000.0, "ess = {}", ess);
    }

    #[test]
    fn autocorrelation_lag_zero_is_one() {
        let values = uniform(100, 3);
        assert!((autocorrelation(&values, 0).unwrap() - 1.0).abs() < 1e-12);
        assert!(autocorrelation(&values, 100).is_err());
    }

    #[test]
    fn autocorrelation_positive_for_ar1() {
        let values = ar1(1000, 0.8, 5);
        assert!(autocorrelation(&values, 1).unwrap() > 0.6);
    }
}
