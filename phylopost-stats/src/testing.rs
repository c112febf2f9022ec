//! Hypothesis testing for comparing MCMC chains.
//!
//! Provides the omnibus [`anova_oneway`] fit with Tukey's honestly
//! significant difference comparisons ([`AnovaFit::tukey_vs`]), and the
//! serial-correlation-adjusted two-sample test [`ess_t_test`] that replaces
//! raw sample sizes with effective sample sizes.

use phylopost_core::{PhylopostError, Result, Scored, Summarizable};

use crate::descriptive;
use crate::distribution::{Distribution, FDistribution, StudentT, StudentizedRange};

/// Result of a hypothesis test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// The test statistic (t, F, q, etc.).
    pub statistic: f64,
    /// Two-tailed p-value.
    pub p_value: f64,
    /// Degrees of freedom, if applicable.
    pub degrees_of_freedom: Option<f64>,
    /// Name of the test method.
    pub method: String,
}

impl Scored for TestResult {
    fn score(&self) -> f64 {
        self.p_value
    }
}

impl Summarizable for TestResult {
    fn summary(&self) -> String {
        match self.degrees_of_freedom {
            Some(df) => format!(
                "{}: statistic={:.4}, df={:.1}, p={:.6}",
                self.method, self.statistic, df, self.p_value,
            ),
            None => format!(
                "{}: statistic={:.4}, p={:.6}",
                self.method, self.statistic, self.p_value,
            ),
        }
    }
}

// ── One-way ANOVA ─────────────────────────────────────────────────────────

/// A fitted one-way analysis of variance, retained for post-hoc comparisons.
#[derive(Debug, Clone)]
pub struct AnovaFit {
    /// Mean of each group, in input order.
    pub group_means: Vec<f64>,
    /// Size of each group, in input order.
    pub group_sizes: Vec<usize>,
    /// Residual mean square.
    pub ms_within: f64,
    /// Residual degrees of freedom (N - k).
    pub df_within: f64,
    /// The omnibus F-test.
    pub test: TestResult,
}

/// One Tukey HSD comparison of a group against the reference group.
#[derive(Debug, Clone, Copy)]
pub struct TukeyComparison {
    /// Index of the compared group.
    pub group: usize,
    /// Mean of the group minus mean of the reference.
    pub diff: f64,
    /// Studentized range statistic |diff| / SE.
    pub q: f64,
    /// Family-wise adjusted p-value.
    pub p_adjusted: f64,
}

/// One-way analysis of variance (ANOVA).
///
/// Tests whether the means of k groups are equal. Each group must have at
/// least 1 observation, and there must be at least 2 groups. Zero
/// within-group variance leaves the F-ratio undefined and is reported as
/// [`PhylopostError::Degenerate`].
pub fn anova_oneway(groups: &[&[f64]]) -> Result<AnovaFit> {
    let k = groups.len();
    if k < 2 {
        return Err(PhylopostError::InvalidInput(
            "anova_oneway: need at least 2 groups".into(),
        ));
    }
    for (i, g) in groups.iter().enumerate() {
        if g.is_empty() {
            return Err(PhylopostError::InvalidInput(format!(
                "anova_oneway: group {} is empty",
                i
            )));
        }
    }

    let n_total: usize = groups.iter().map(|g| g.len()).sum();
    if n_total <= k {
        return Err(PhylopostError::InvalidInput(
            "anova_oneway: total observations must exceed number of groups".into(),
        ));
    }

    let group_means: Vec<f64> = groups
        .iter()
        .map(|g| g.iter().sum::<f64>() / g.len() as f64)
        .collect();
    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n_total as f64;

    let ss_between: f64 = groups
        .iter()
        .zip(&group_means)
        .map(|(g, &m)| g.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .zip(&group_means)
        .map(|(g, &m)| descriptive::sum_squared_deviations(g, m))
        .sum();

    let df_between = (k - 1) as f64;
    let df_within = (n_total - k) as f64;
    let ms_between = ss_between / df_between;
    let ms_within = ss_within / df_within;

    if !(ms_within > 0.0) {
        return Err(PhylopostError::Degenerate(
            "anova_oneway: zero within-group variance".into(),
        ));
    }

    let f_stat = ms_between / ms_within;
    let f_dist = FDistribution::new(df_between, df_within)?;
    let p_value = 1.0 - f_dist.cdf(f_stat);

    Ok(AnovaFit {
        group_means,
        group_sizes: groups.iter().map(|g| g.len()).collect(),
        ms_within,
        df_within,
        test: TestResult {
            statistic: f_stat,
            p_value,
            degrees_of_freedom: Some(df_between),
            method: "One-way ANOVA".into(),
        },
    })
}

impl AnovaFit {
    /// Number of groups in the fit.
    pub fn groups(&self) -> usize {
        self.group_means.len()
    }

    /// Tukey HSD (Tukey-Kramer for unequal sizes) comparison of every group
    /// against `reference`.
    ///
    /// The adjusted p-value accounts for all `k(k-1)/2` pairwise comparisons
    /// of the fit. The reference compared with itself has `p = 1`.
    pub fn tukey_vs(&self, reference: usize) -> Result<Vec<TukeyComparison>> {
        let k = self.groups();
        if reference >= k {
            return Err(PhylopostError::InvalidInput(format!(
                "tukey_vs: reference group {} out of range for {} groups",
                reference, k
            )));
        }
        if self.df_within < 2.0 {
            return Err(PhylopostError::Degenerate(format!(
                "tukey_vs: {} residual degrees of freedom, need at least 2",
                self.df_within
            )));
        }
        let range = StudentizedRange::new(k, self.df_within)?;
        let n_ref = self.group_sizes[reference] as f64;
        let mean_ref = self.group_means[reference];

        Ok((0..k)
            .map(|group| {
                if group == reference {
                    return TukeyComparison {
                        group,
                        diff: 0.0,
                        q: 0.0,
                        p_adjusted: 1.0,
                    };
                }
                let n = self.group_sizes[group] as f64;
                let diff = self.group_means[group] - mean_ref;
                let se = (self.ms_within / 2.0 * (1.0 / n + 1.0 / n_ref)).sqrt();
                let q = diff.abs() / se;
                TukeyComparison {
                    group,
                    diff,
                    q,
                    p_adjusted: range.sf(q).clamp(0.0, 1.0),
                }
            })
            .collect())
    }
}

// ── Serial-correlation-adjusted two-sample test ───────────────────────────

/// Two-sample mean-difference test for autocorrelated traces.
///
/// Uses the pooled standard deviation of the raw samples, but replaces the
/// sample sizes in the standard error by the effective sample sizes:
///
/// ```text
/// s = sqrt((Σ(x - x̄)² + Σ(y - ȳ)²) / (n + m - 2))
/// t = (ȳ - x̄) / (s · (1/√ESS_x + 1/√ESS_y))
/// p = 2 · min(F(t), 1 - F(t)),  F = Student t with ESS_x + ESS_y - 2 df
/// ```
///
/// A sample with fewer than two observations, zero pooled variance, a
/// non-positive ESS, or non-positive degrees of freedom is reported as
/// [`PhylopostError::Degenerate`].
pub fn ess_t_test(x: &[f64], y: &[f64], ess_x: f64, ess_y: f64) -> Result<TestResult> {
    if x.len() < 2 || y.len() < 2 {
        return Err(PhylopostError::Degenerate(format!(
            "ess_t_test: each sample needs at least 2 observations (got {} and {})",
            x.len(),
            y.len()
        )));
    }
    if !(ess_x > 0.0 && ess_y > 0.0) || !ess_x.is_finite() || !ess_y.is_finite() {
        return Err(PhylopostError::Degenerate(format!(
            "ess_t_test: effective sample sizes must be positive (got {} and {})",
            ess_x, ess_y
        )));
    }
    let df = ess_x + ess_y - 2.0;
    if !(df > 0.0) {
        return Err(PhylopostError::Degenerate(format!(
            "ess_t_test: {} degrees of freedom",
            df
        )));
    }

    let mean_x = descriptive::mean(x)?;
    let mean_y = descriptive::mean(y)?;
    let ss = descriptive::sum_squared_deviations(x, mean_x)
        + descriptive::sum_squared_deviations(y, mean_y);
    let s = (ss / (x.len() + y.len() - 2) as f64).sqrt();
    if !(s > 0.0) {
        return Err(PhylopostError::Degenerate(
            "ess_t_test: pooled standard deviation is zero".into(),
        ));
    }

    let t = (mean_y - mean_x) / (s * (1.0 / ess_x.sqrt() + 1.0 / ess_y.sqrt()));
    let cdf = StudentT::new(df)?.cdf(t);
    let p = 2.0 * cdf.min(1.0 - cdf);

    Ok(TestResult {
        statistic: t,
        p_value: p.clamp(0.0, 1.0),
        degrees_of_freedom: Some(df),
        method: "ESS-adjusted two-sample t-test".into(),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────
