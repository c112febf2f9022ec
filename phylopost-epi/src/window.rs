//! Restricting time-indexed summaries to a calendar window.

use chrono::NaiveDate;
use phylopost_core::{PhylopostError, Result};

use crate::config::EstimatorConfig;
use crate::dates::decimal_year_to_date;
use crate::timeseries::EpidemicSummary;

/// Inclusive date range. An open start keeps everything up to `end`; an
/// open end stops at the last trajectory time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self::new(config.start, config.end)
    }

    /// Keep the rows of `summary` dated within the window. `max_time` is
    /// the last time of the trajectories the summary came from.
    pub fn restrict(&self, summary: &EpidemicSummary, max_time: f64) -> Result<EpidemicSummary> {
        let end = match self.end {
            Some(end) => end,
            None => decimal_year_to_date(max_time)?,
        };
        if let Some(start) = self.start {
            if start > end {
                return Err(PhylopostError::InvalidInput(format!(
                    "window start {} is after end {}",
                    start, end
                )));
            }
        }
        Ok(EpidemicSummary {
            quantity: summary.quantity.clone(),
            rows: summary
                .rows
                .iter()
                .filter(|r| self.start.map_or(true, |s| r.date >= s) && r.date <= end)
                .copied()
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::SummaryRow;

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    fn summary() -> EpidemicSummary {
        let rows = [(1, 1), (2, 1), (3, 1), (4, 1)]
            .iter()
            .map(|&(m, d)| SummaryRow {
                time: 2020.0 + m as f64 / 12.0,
                date: ymd(m, d),
                median: 1.0,
                lower: 0.5,
                upper: 1.5,
                n: 10,
            })
            .collect();
        EpidemicSummary {
            quantity: "rt".into(),
            rows,
        }
    }

    #[test]
    fn inclusive_bounds() {
        let window = DateWindow::new(Some(ymd(2, 1)), Some(ymd(3, 1)));
        let out = window.restrict(&summary(), 2021.0).unwrap();
        let dates: Vec<NaiveDate> = out.rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![ymd(2, 1), ymd(3, 1)]);
        assert_eq!(out.quantity, "rt");
    }

    #[test]
    fn open_end_uses_max_time() {
        // 2020.2 falls on 14 March 2020.
        let out = DateWindow::default().restrict(&summary(), 2020.2).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn inverted_window_rejected() {
        let window = DateWindow::new(Some(ymd(4, 1)), None);
        assert!(window.restrict(&summary(), 2020.1).is_err());
    }
}
