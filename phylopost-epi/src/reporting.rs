//! Reporting rate: reported cumulative cases over estimated cumulative
//! infections.
//!
//! Reported cases are keyed by calendar date. The estimate at time index
//! `i` is compared with the cases reported on the date of time index
//! `i + 1`, a one-step lead between the two series.

use std::path::Path;

use chrono::NaiveDate;
use phylopost_core::{PhylopostError, Result};
use phylopost_io::{read_dated_table, DatedTable};
use phylopost_mcmc::CombinedSample;
use tracing::warn;

use crate::config::{EstimatorConfig, ReportedColumns};
use crate::dates::decimal_year_to_date;
use crate::timeseries::{summarize_over_time, EpidemicSummary};

/// Cumulative reported cases by date, sorted and without duplicate dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedCases {
    dates: Vec<NaiveDate>,
    cumulative: Vec<f64>,
}

impl ReportedCases {
    pub fn new(dates: Vec<NaiveDate>, cumulative: Vec<f64>) -> Result<Self> {
        if dates.len() != cumulative.len() {
            return Err(PhylopostError::InvalidInput(format!(
                "{} dates but {} counts",
                dates.len(),
                cumulative.len()
            )));
        }
        let mut pairs: Vec<(NaiveDate, f64)> = dates.into_iter().zip(cumulative).collect();
        pairs.sort_by_key(|&(d, _)| d);
        if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(PhylopostError::Validation(format!(
                "date {} reported more than once",
                w[0].0
            )));
        }
        let (dates, cumulative) = pairs.into_iter().unzip();
        Ok(Self { dates, cumulative })
    }

    /// Build from a dated table. The cumulative column is used when
    /// present; otherwise the incident column is summed in date order,
    /// with missing counts taken as zero.
    pub fn from_table(table: &DatedTable, columns: &ReportedColumns) -> Result<Self> {
        if let Some(cumulative) = table.column(&columns.cumulative) {
            return Self::new(table.dates.clone(), cumulative);
        }
        let incident = table.column(&columns.incident).ok_or_else(|| {
            PhylopostError::Validation(format!(
                "reported cases need a '{}' or '{}' column",
                columns.cumulative, columns.incident
            ))
        })?;
        let missing = incident.iter().filter(|v| v.is_nan()).count();
        if missing > 0 {
            warn!(rows = missing, "Missing incident counts taken as zero");
        }
        let daily = Self::new(table.dates.clone(), incident)?;
        let cumulative = daily
            .cumulative
            .iter()
            .scan(0.0, |total, &v| {
                if !v.is_nan() {
                    *total += v;
                }
                Some(*total)
            })
            .collect();
        Ok(Self {
            dates: daily.dates,
            cumulative,
        })
    }

    /// Read a reported-cases table from `path`.
    pub fn read(path: impl AsRef<Path>, columns: &ReportedColumns) -> Result<Self> {
        let table = read_dated_table(path, &columns.date)?;
        Self::from_table(&table, columns)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Cumulative count reported on `date`, if any.
    pub fn on(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.cumulative[i])
    }
}

/// Fraction of estimated infections that were reported, per time point.
///
/// Per draw, `reported(date of t_{i+1}) / cumulative_infections(t_i)`,
/// summarized across draws at each `t_i`. Time points without a report on
/// the following date are left out. The summary is clipped to 1, so the
/// upper bound never exceeds 1 and `lower <= median <= upper` still holds.
pub fn reporting_rate(
    sample: &CombinedSample,
    reported: &ReportedCases,
    config: &EstimatorConfig,
) -> Result<EpidemicSummary> {
    config.validate()?;
    let table = sample.trajectories();
    if table.is_empty() {
        return Err(PhylopostError::Validation(
            "combined sample has no trajectories".into(),
        ));
    }
    let cumulative = table
        .variable_index(&config.state.cumulative)
        .ok_or_else(|| {
            PhylopostError::Validation(format!(
                "trajectories have no '{}' state variable",
                config.state.cumulative
            ))
        })?;

    let times = table.times();
    let lead: Vec<Option<f64>> = (0..times.len())
        .map(|i| -> Result<Option<f64>> {
            match times.get(i + 1) {
                Some(&next) => Ok(reported.on(decimal_year_to_date(next)?)),
                None => Ok(None),
            }
        })
        .collect::<Result<_>>()?;

    let values: Vec<Vec<f64>> = table
        .trajectories()
        .iter()
        .map(|traj| {
            lead.iter()
                .zip(&traj.states[cumulative])
                .map(|(cases, &estimated)| cases.map_or(f64::NAN, |c| c / estimated))
                .collect()
        })
        .collect();

    let mut summary = summarize_over_time("reporting_rate", times, &values, config.interval)?;
    // Clip every bound so the interval stays ordered.
    for row in &mut summary.rows {
        row.lower = row.lower.min(1.0);
        row.median = row.median.min(1.0);
        row.upper = row.upper.min(1.0);
    }
    Ok(summary)
}
