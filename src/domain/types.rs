//! Shared configuration enums.
//!
//! These are lightweight, `Copy`, and serializable so they can be used as CLI
//! values (`clap::ValueEnum`), stored in exports, and switched on in the TUI.

use chrono::{Datelike, NaiveDateTime, Timelike};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How to fill gaps left after resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FillMethod {
    /// Carry the last present value forward.
    Forward,
    /// Linear interpolation in elapsed time between present neighbours.
    Interpolate,
}

/// Block bootstrap flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum BootstrapStrategy {
    /// Moving block: blocks never run past the end of the sample.
    #[serde(rename = "mb")]
    #[value(name = "mb")]
    MovingBlock,
    /// Circular block: blocks wrap around to the start of the sample.
    #[serde(rename = "cb")]
    #[value(name = "cb")]
    CircularBlock,
}

impl BootstrapStrategy {
    pub fn label(self) -> &'static str {
        match self {
            BootstrapStrategy::MovingBlock => "moving block",
            BootstrapStrategy::CircularBlock => "circular block",
        }
    }
}

/// Calendar component extracted from a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatetimeAttr {
    Hour,
    Day,
    #[value(name = "dayofweek")]
    #[serde(rename = "dayofweek")]
    Weekday,
    #[value(name = "dayofyear")]
    #[serde(rename = "dayofyear")]
    DayOfYear,
    Month,
    Quarter,
    Year,
}

impl DatetimeAttr {
    /// Numeric value of this component for `t` (weekday: Monday = 0).
    pub fn of(self, t: NaiveDateTime) -> i64 {
        match self {
            DatetimeAttr::Hour => i64::from(t.hour()),
            DatetimeAttr::Day => i64::from(t.day()),
            DatetimeAttr::Weekday => i64::from(t.weekday().num_days_from_monday()),
            DatetimeAttr::DayOfYear => i64::from(t.ordinal()),
            DatetimeAttr::Month => i64::from(t.month()),
            DatetimeAttr::Quarter => i64::from((t.month() - 1) / 3 + 1),
            DatetimeAttr::Year => i64::from(t.year()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DatetimeAttr::Hour => "hour",
            DatetimeAttr::Day => "day",
            DatetimeAttr::Weekday => "dayofweek",
            DatetimeAttr::DayOfYear => "dayofyear",
            DatetimeAttr::Month => "month",
            DatetimeAttr::Quarter => "quarter",
            DatetimeAttr::Year => "year",
        }
    }
}

/// Deterministic terms included in unit-root and stationarity test regressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Regression {
    /// No constant, no trend.
    N,
    /// Constant only.
    C,
    /// Constant and linear trend.
    Ct,
}

impl Regression {
    pub fn code(self) -> &'static str {
        match self {
            Regression::N => "n",
            Regression::C => "c",
            Regression::Ct => "ct",
        }
    }

    /// Number of deterministic regressors.
    pub fn n_trend(self) -> usize {
        match self {
            Regression::N => 0,
            Regression::C => 1,
            Regression::Ct => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn datetime_attrs() {
        let t = NaiveDate::from_ymd_opt(2021, 8, 15).unwrap().and_hms_opt(13, 0, 0).unwrap();
        assert_eq!(DatetimeAttr::Hour.of(t), 13);
        assert_eq!(DatetimeAttr::Day.of(t), 15);
        assert_eq!(DatetimeAttr::Weekday.of(t), 6); // Sunday
        assert_eq!(DatetimeAttr::Month.of(t), 8);
        assert_eq!(DatetimeAttr::Quarter.of(t), 3);
        assert_eq!(DatetimeAttr::Year.of(t), 2021);
        assert_eq!(DatetimeAttr::DayOfYear.of(t), 227);
    }
}
