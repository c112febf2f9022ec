//! Model parameters of each draw, with logged defaults.
//!
//! `tau` and `p_h` are not estimated in every analysis. When a draw table
//! has no such column, or a draw has no value for it, the configured
//! default is substituted and the substitution is logged.

use phylopost_core::{PhylopostError, Result, Summarizable};
use phylopost_mcmc::{Draw, DrawTable, SampleKey};
use phylopost_stats::{credible_interval, Interval};
use serde::Serialize;
use tracing::warn;

use crate::config::{EstimatorConfig, ParameterDefaults};

/// Transmission parameters of one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub b: f64,
    pub tau: f64,
    pub p_h: f64,
    /// Whether `tau` or `p_h` came from the defaults.
    pub defaulted: bool,
}

/// Positions of the model parameters in a draw table.
#[derive(Debug, Clone)]
pub struct ParamColumns {
    b: usize,
    tau: Option<usize>,
    p_h: Option<usize>,
    defaults: ParameterDefaults,
}

impl ParamColumns {
    /// Locate the parameters in `draws`. `b` is required.
    pub fn resolve(draws: &DrawTable, config: &EstimatorConfig) -> Result<Self> {
        let names = &config.parameters;
        let b = draws.parameter_index(&names.b).ok_or_else(|| {
            PhylopostError::Validation(format!("draws have no '{}' parameter", names.b))
        })?;
        let tau = draws.parameter_index(&names.tau);
        let p_h = draws.parameter_index(&names.p_h);
        if tau.is_none() {
            warn!(
                parameter = %names.tau,
                default = config.defaults.tau,
                "Parameter absent from draws, using default"
            );
        }
        if p_h.is_none() {
            warn!(
                parameter = %names.p_h,
                default = config.defaults.p_h,
                "Parameter absent from draws, using default"
            );
        }
        Ok(Self {
            b,
            tau,
            p_h,
            defaults: config.defaults,
        })
    }
}

impl ModelParams {
    /// Read the parameters of `draw`, filling a missing `tau` or `p_h` with
    /// its default. A missing `b` stays NaN.
    pub fn from_draw(draw: &Draw<SampleKey>, columns: &ParamColumns) -> Self {
        let read = |idx: Option<usize>| idx.map(|i| draw.values[i]).filter(|v| !v.is_nan());
        let tau = read(columns.tau);
        let p_h = read(columns.p_h);
        Self {
            b: draw.values[columns.b],
            tau: tau.unwrap_or(columns.defaults.tau),
            p_h: p_h.unwrap_or(columns.defaults.p_h),
            defaulted: tau.is_none() || p_h.is_none(),
        }
    }
}

/// Parameters of every draw, in draw order.
///
/// Logs one warning with the number of draws that needed a default.
pub fn model_params(draws: &DrawTable, config: &EstimatorConfig) -> Result<Vec<ModelParams>> {
    let columns = ParamColumns::resolve(draws, config)?;
    let params: Vec<ModelParams> = draws
        .draws()
        .iter()
        .map(|d| ModelParams::from_draw(d, &columns))
        .collect();
    let defaulted = params.iter().filter(|p| p.defaulted).count();
    if defaulted > 0 {
        warn!(
            draws = defaulted,
            tau = config.defaults.tau,
            p_h = config.defaults.p_h,
            "Filled missing model parameters with defaults"
        );
    }
    Ok(params)
}

/// Posterior median and interval of one parameter, one CSV row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    pub median: f64,
    pub lower: f64,
    pub upper: f64,
    /// Draws with a value for this parameter.
    pub n: usize,
}

impl ParameterSummary {
    pub fn interval(&self) -> Interval {
        Interval {
            median: self.median,
            lower: self.lower,
            upper: self.upper,
        }
    }
}

impl Summarizable for ParameterSummary {
    fn summary(&self) -> String {
        format!("{} = {} (n={})", self.name, self.interval().summary(), self.n)
    }
}

/// Median and credible interval of every parameter with at least one value.
pub fn summarize_parameters(draws: &DrawTable, level: f64) -> Result<Vec<ParameterSummary>> {
    let mut out = Vec::with_capacity(draws.parameters().len() + 1);
    let log_posterior: Vec<f64> = draws.draws().iter().map(|d| d.log_posterior).collect();
    let columns = std::iter::once(("posterior".to_string(), log_posterior)).chain(
        draws
            .parameters()
            .iter()
            .filter_map(|name| draws.column(name).map(|c| (name.clone(), c))),
    );
    for (name, values) in columns {
        let finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            continue;
        }
        let interval = credible_interval(&finite, level).map_err(|e| e.context(&name))?;
        out.push(ParameterSummary {
            name,
            median: interval.median,
            lower: interval.lower,
            upper: interval.upper,
            n: finite.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(parameters: &[&str], rows: &[Vec<f64>]) -> DrawTable {
        DrawTable::new(
            parameters.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .enumerate()
                .map(|(i, values)| Draw {
                    key: SampleKey {
                        sample: i as u64,
                        chain: 0,
                    },
                    log_posterior: -(i as f64),
                    values: values.clone(),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn reads_present_parameters() {
        let draws = table(&["b", "tau", "p_h"], &[vec![15.0, 50.0, 0.1]]);
        let params = model_params(&draws, &EstimatorConfig::default()).unwrap();
        assert_eq!(
            params[0],
            ModelParams {
                b: 15.0,
                tau: 50.0,
                p_h: 0.1,
                defaulted: false,
            }
        );
    }

    #[test]
    fn fills_absent_columns_with_defaults() {
        let draws = table(&["b"], &[vec![15.0]]);
        let params = model_params(&draws, &EstimatorConfig::default()).unwrap();
        assert_eq!(params[0].tau, 74.0);
        assert_eq!(params[0].p_h, 0.2);
        assert!(params[0].defaulted);
    }

    #[test]
    fn fills_missing_values_per_draw() {
        let draws = table(
            &["b", "p_h", "tau"],
            &[vec![15.0, f64::NAN, 60.0], vec![14.0, 0.3, 61.0]],
        );
        let params = model_params(&draws, &EstimatorConfig::default()).unwrap();
        assert_eq!(params[0].p_h, 0.2);
        assert_eq!(params[0].tau, 60.0);
        assert!(params[0].defaulted);
        assert!(!params[1].defaulted);
    }

    #[test]
    fn b_is_required() {
        let draws = table(&["beta"], &[vec![15.0]]);
        let err = model_params(&draws, &EstimatorConfig::default()).unwrap_err();
        assert!(matches!(err, PhylopostError::Validation(_)));
    }

    #[test]
    fn parameter_summaries() {
        let rows: Vec<Vec<f64>> = (0..=100).map(|i| vec![i as f64, f64::NAN]).collect();
        let draws = table(&["b", "tau"], &rows);
        let summaries = summarize_parameters(&draws, 0.9).unwrap();
        // "tau" has no values and is skipped.
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["posterior", "b"]);
        let b = &summaries[1];
        assert_eq!(b.n, 101);
        assert!((b.median - 50.0).abs() < 1e-12);
        assert!((b.lower - 5.0).abs() < 1e-9);
        assert!((b.upper - 95.0).abs() < 1e-9);
        assert!(b.summary().starts_with("b = 50.0000"));
    }
}
