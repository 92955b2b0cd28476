//! Reporting utilities: series summaries, component strengths, and formatted
//! terminal output (`format`).

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::TimeSeries;
use crate::stats::{mean, seasonal_strength, std, trend_strength, Decomposition};

pub mod format;

pub use format::*;

/// Basic statistics over a series' present values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub name: String,
    pub n: usize,
    pub missing: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub freq: Option<String>,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

pub fn summarize(series: &TimeSeries) -> SeriesSummary {
    let present = series.finite_values();
    let (min, max) = present
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    SeriesSummary {
        name: series.name.clone(),
        n: series.len(),
        missing: series.len() - present.len(),
        start: series.first().map(|(t, _)| t),
        end: series.last().map(|(t, _)| t),
        freq: series.frequency().ok().map(|f| f.to_string()),
        mean: mean(&present),
        std: std(&present),
        min: if present.is_empty() { f64::NAN } else { min },
        max: if present.is_empty() { f64::NAN } else { max },
    }
}

/// Trend and seasonal strength of a decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Strengths {
    pub period: usize,
    pub trend: f64,
    pub seasonal: f64,
}

pub fn strengths(decomposition: &Decomposition) -> Strengths {
    let resid = &decomposition.resid.values;
    Strengths {
        period: decomposition.period,
        trend: trend_strength(&decomposition.trend.values, resid),
        seasonal: seasonal_strength(&decomposition.seasonal.values, resid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::decompose_additive;
    use chrono::{Duration, NaiveDate};

    fn daily(values: Vec<f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let index = (0..values.len() as i64).map(|d| start + Duration::days(d)).collect();
        TimeSeries::new("v", index, values).unwrap()
    }

    #[test]
    fn summarize_skips_missing() {
        let s = summarize(&daily(vec![1.0, f64::NAN, 3.0]));
        assert_eq!(s.n, 3);
        assert_eq!(s.missing, 1);
        assert_eq!(s.mean, 2.0);
        assert_eq!((s.min, s.max), (1.0, 3.0));
        assert_eq!(s.freq.as_deref(), Some("1D"));

        let empty = summarize(&daily(Vec::new()));
        assert!(empty.min.is_nan());
        assert_eq!(empty.start, None);
    }

    #[test]
    fn strong_seasonality_is_detected() {
        let values: Vec<f64> = (0..56)
            .map(|i| [0.0, 5.0, 0.0, -5.0, 1.0, 2.0, -3.0][i % 7] + i as f64 * 0.01 + if i % 3 == 0 { 0.05 } else { 0.0 })
            .collect();
        let d = decompose_additive(&daily(values), 7).unwrap();
        let s = strengths(&d);
        assert_eq!(s.period, 7);
        assert!(s.seasonal > 0.9, "{s:?}");
        assert!((0.0..=1.0).contains(&s.trend));
    }
}
