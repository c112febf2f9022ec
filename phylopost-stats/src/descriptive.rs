//! Descriptive statistics for posterior samples.
//!
//! Provides the location and spread functions ([`mean`], [`median`],
//! [`variance`], [`quantile`]) used by the convergence tests, the
//! [`describe`] summary of a single trace, and [`credible_interval`] for
//! reporting posterior medians with two-sided equal-tailed intervals.

use phylopost_core::{PhylopostError, Result, Summarizable};

/// Location and spread of one trace (e.g. a chain's log-posterior density).
#[derive(Debug, Clone)]
pub struct TraceStats {
    /// Number of observations.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median (50th percentile).
    pub median: f64,
    /// Sample standard deviation (ddof=1), NaN for a single observation.
    pub std_dev: f64,
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
}

impl Summarizable for TraceStats {
    fn summary(&self) -> String {
        format!(
            "n={}, mean={:.4}, median={:.4}, sd={:.4}",
            self.count, self.mean, self.median, self.std_dev,
        )
    }
}

/// Summarize a trace. Requires at least one element.
pub fn describe(data: &[f64]) -> Result<TraceStats> {
    if data.is_empty() {
        return Err(PhylopostError::InvalidInput(
            "describe: data must not be empty".into(),
        ));
    }

    let n = data.len();
    let mean_val = data.iter().sum::<f64>() / n as f64;
    let ss = sum_squared_deviations(data, mean_val);
    let std_dev = if n > 1 {
        (ss / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(TraceStats {
        count: n,
        mean: mean_val,
        median: quantile_sorted(&sorted, 0.5),
        std_dev,
        min: sorted[0],
        max: sorted[n - 1],
    })
}

/// Arithmetic mean.
pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(PhylopostError::InvalidInput(
            "mean: data must not be empty".into(),
        ));
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Median (50th percentile).
pub fn median(data: &[f64]) -> Result<f64> {
    quantile(data, 0.5)
}

/// Sum of squared deviations from `center`.
pub fn sum_squared_deviations(data: &[f64], center: f64) -> f64 {
    data.iter().map(|&x| (x - center).powi(2)).sum()
}

/// Variance with given degrees-of-freedom correction.
///
/// - `ddof = 0` → population variance
/// - `ddof = 1` → sample variance (Bessel's correction)
pub fn variance(data: &[f64], ddof: usize) -> Result<f64> {
    let n = data.len();
    if n <= ddof {
        return Err(PhylopostError::InvalidInput(format!(
            "variance: need more than {} observations (got {})",
            ddof, n,
        )));
    }
    let m = mean(data)?;
    Ok(sum_squared_deviations(data, m) / (n - ddof) as f64)
}

/// Quantile using linear interpolation between order statistics.
pub fn quantile(data: &[f64], q: f64) -> Result<f64> {
    Ok(quantiles(data, &[q])?[0])
}

/// Several quantiles of the same data, sorting only once.
pub fn quantiles(data: &[f64], qs: &[f64]) -> Result<Vec<f64>> {
    if data.is_empty() {
        return Err(PhylopostError::InvalidInput(
            "quantile: data must not be empty".into(),
        ));
    }
    if let Some(q) = qs.iter().find(|q| !(0.0..=1.0).contains(*q)) {
        return Err(PhylopostError::InvalidInput(format!(
            "quantile: q must be in [0, 1], got {}",
            q
        )));
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(qs.iter().map(|&q| quantile_sorted(&sorted, q)).collect())
}

// ── Credible intervals ─────────────────────────────────────────────────────

/// Posterior median with a two-sided equal-tailed interval.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub median: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    /// Whether `x` lies within `[lower, upper]`.
    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }
}

impl Summarizable for Interval {
    fn summary(&self) -> String {
        format!("{:.4} [{:.4}, {:.4}]", self.median, self.lower, self.upper)
    }
}

/// Median and equal-tailed interval with coverage `level` (e.g. 0.95 gives
/// the 2.5th and 97.5th percentiles).
pub fn credible_interval(data: &[f64], level: f64) -> Result<Interval> {
    if !(level > 0.0 && level < 1.0) {
        return Err(PhylopostError::InvalidInput(format!(
            "credible_interval: level must be in (0, 1), got {}",
            level
        )));
    }
    let tail = (1.0 - level) / 2.0;
    let q = quantiles(data, &[0.5, tail, 1.0 - tail])?;
    Ok(Interval {
        median: q[0],
        lower: q[1],
        upper: q[2],
    })
}

// ── Internal ───────────────────────────────────────────────────────────────

/// Compute a quantile from a pre-sorted slice using linear interpolation.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = lo + 1;
    let frac = pos - lo as f64;
    if hi >= n {
        sorted[n - 1]
    } else {
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
