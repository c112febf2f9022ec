//! Decimal-year time axis.
//!
//! Trajectory times are decimal years: `2020.0` is the first instant of
//! 1 January 2020 and each year is divided into its own number of days.
//! A time maps to the calendar day it falls in (the fractional day is
//! floored).

use chrono::{Datelike, Days, NaiveDate};
use phylopost_core::{PhylopostError, Result};

/// Slack absorbing rounding when a day boundary is computed from a time.
const DAY_EPS: f64 = 1e-6;

fn days_in_year(year: i32) -> f64 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    }
}

/// The calendar day containing decimal-year time `t`.
pub fn decimal_year_to_date(t: f64) -> Result<NaiveDate> {
    if !t.is_finite() || t.abs() > 100_000.0 {
        return Err(PhylopostError::InvalidInput(format!(
            "time {} is not a usable decimal year",
            t
        )));
    }
    let year = t.floor() as i32;
    let offset = ((t - year as f64) * days_in_year(year) + DAY_EPS).floor() as u64;
    NaiveDate::from_yo_opt(year, 1)
        .and_then(|d| d.checked_add_days(Days::new(offset)))
        .ok_or_else(|| PhylopostError::InvalidInput(format!("time {} is out of range", t)))
}

/// Decimal-year time of the first instant of `date`.
pub fn date_to_decimal_year(date: NaiveDate) -> f64 {
    let year = date.year();
    year as f64 + date.ordinal0() as f64 / days_in_year(year)
}
