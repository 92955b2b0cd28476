//! Benchmark forecasters: last value, last season, and straight-line drift.
//!
//! Each forecaster returns a series over the future index (the `steps`
//! periods after the last observation, at the series' frequency). The
//! one-step fitted values feed the residual bootstrap in `bootstrap`.

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::TimeSeries;
use crate::error::AppError;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ForecastMethod {
    Naive,
    SeasonalNaive,
    Drift,
}

impl ForecastMethod {
    pub const ALL: [ForecastMethod; 3] = [ForecastMethod::Naive, ForecastMethod::SeasonalNaive, ForecastMethod::Drift];

    pub fn label(self) -> &'static str {
        match self {
            ForecastMethod::Naive => "naive",
            ForecastMethod::SeasonalNaive => "seasonal naive",
            ForecastMethod::Drift => "drift",
        }
    }

    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    /// Point forecast; `period` only matters for the seasonal method.
    pub fn forecast(self, series: &TimeSeries, steps: usize, period: usize) -> Result<TimeSeries, AppError> {
        match self {
            ForecastMethod::Naive => naive_forecast(series, steps),
            ForecastMethod::SeasonalNaive => seasonal_naive_forecast(series, period, steps),
            ForecastMethod::Drift => drift_forecast(series, steps),
        }
    }

    /// In-sample one-step-ahead predictions, NaN where no history exists yet.
    pub fn fitted(self, series: &TimeSeries, period: usize) -> Result<Vec<f64>, AppError> {
        ensure_not_empty(series)?;
        let y = &series.values;
        let n = y.len();
        match self {
            ForecastMethod::Naive => Ok((0..n).map(|t| if t == 0 { f64::NAN } else { y[t - 1] }).collect()),
            ForecastMethod::SeasonalNaive => {
                check_period(series, period)?;
                Ok((0..n).map(|t| if t < period { f64::NAN } else { y[t - period] }).collect())
            }
            ForecastMethod::Drift => {
                let slope = drift_slope(series)?;
                Ok((0..n)
                    .map(|t| {
                        if t == 0 {
                            f64::NAN
                        } else {
                            y[t - 1] + slope * days_between(series.index[t - 1], series.index[t])
                        }
                    })
                    .collect())
            }
        }
    }

    /// `y − fitted`, NaN where the fit is undefined.
    pub fn residuals(self, series: &TimeSeries, period: usize) -> Result<Vec<f64>, AppError> {
        let fitted = self.fitted(series, period)?;
        Ok(series.values.iter().zip(fitted).map(|(y, f)| y - f).collect())
    }

    /// Advance a simulated path by one step: `path` holds history then simulated values.
    pub(crate) fn step(self, path: &[f64], period: usize, slope: f64, dt_days: f64) -> f64 {
        let last = path.last().copied().unwrap_or(f64::NAN);
        match self {
            ForecastMethod::Naive => last,
            ForecastMethod::SeasonalNaive => path
                .len()
                .checked_sub(period)
                .map(|i| path[i])
                .unwrap_or(f64::NAN),
            ForecastMethod::Drift => last + slope * dt_days,
        }
    }
}

/// The `steps` timestamps after the last observation.
pub fn future_index(series: &TimeSeries, steps: usize) -> Result<Vec<NaiveDateTime>, AppError> {
    let (last, _) = series
        .last()
        .ok_or_else(|| AppError::data(format!("Series '{}' is empty.", series.name)))?;
    series.frequency()?.range_after(last, steps)
}

/// Repeat the last observed value.
pub fn naive_forecast(series: &TimeSeries, steps: usize) -> Result<TimeSeries, AppError> {
    ensure_not_empty(series)?;
    let index = future_index(series, steps)?;
    let last = series.values[series.len() - 1];
    output(series, index, vec![last; steps])
}

/// Repeat the last `period` observed values, cycling.
pub fn seasonal_naive_forecast(series: &TimeSeries, period: usize, steps: usize) -> Result<TimeSeries, AppError> {
    ensure_not_empty(series)?;
    check_period(series, period)?;
    let index = future_index(series, steps)?;
    let season = &series.values[series.len() - period..];
    let values = season.iter().copied().cycle().take(steps).collect();
    output(series, index, values)
}

/// Extend the line through the first and last observations.
///
/// `x` is elapsed time since the first observation in (fractional) days, so
/// the slope is per day whatever the series frequency.
pub fn drift_forecast(series: &TimeSeries, steps: usize) -> Result<TimeSeries, AppError> {
    let slope = drift_slope(series)?;
    let (t0, y0) = series
        .first()
        .ok_or_else(|| AppError::data(format!("Series '{}' is empty.", series.name)))?;
    let index = future_index(series, steps)?;
    let values = index.iter().map(|&t| slope * days_between(t0, t) + y0).collect();
    output(series, index, values)
}

/// Change per day between the first and last observation.
pub(crate) fn drift_slope(series: &TimeSeries) -> Result<f64, AppError> {
    let ((t0, y0), (t1, y1)) = series
        .first()
        .zip(series.last())
        .ok_or_else(|| AppError::data(format!("Series '{}' is empty.", series.name)))?;
    let dx = days_between(t0, t1);
    if dx <= 0.0 {
        return Err(AppError::data(format!(
            "Drift needs two distinct timestamps; series '{}' spans none.",
            series.name
        )));
    }
    Ok((y1 - y0) / dx)
}

pub(crate) fn days_between(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    (b - a).num_seconds() as f64 / SECONDS_PER_DAY
}

fn check_period(series: &TimeSeries, period: usize) -> Result<(), AppError> {
    if period == 0 || period > series.len() {
        return Err(AppError::usage(format!(
            "Seasonal period must be between 1 and {} (got {period}).",
            series.len()
        )));
    }
    Ok(())
}

fn ensure_not_empty(series: &TimeSeries) -> Result<(), AppError> {
    if series.is_empty() {
        return Err(AppError::data(format!("Series '{}' is empty.", series.name)));
    }
    Ok(())
}

fn output(series: &TimeSeries, index: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<TimeSeries, AppError> {
    let mut out = TimeSeries::new(series.name.clone(), index, values)?;
    out.freq = series.freq.or(out.freq);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn daily(values: &[f64]) -> TimeSeries {
        let index = (0..values.len()).map(|i| day(2021, 1, 1 + i as u32)).collect();
        TimeSeries::new("y", index, values.to_vec()).unwrap()
    }

    #[test]
    fn naive_repeats_last_value() {
        let f = naive_forecast(&daily(&[1.0, 2.0, 3.0]), 2).unwrap();
        assert_eq!(f.values, vec![3.0, 3.0]);
        assert_eq!(f.index, vec![day(2021, 1, 4), day(2021, 1, 5)]);
        assert_eq!(f.name, "y");
        assert_eq!(f.freq, Some(Frequency::Days(1)));
    }

    #[test]
    fn seasonal_naive_cycles_last_period() {
        let s = daily(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let f = seasonal_naive_forecast(&s, 2, 5).unwrap();
        assert_eq!(f.values, vec![4.0, 5.0, 4.0, 5.0, 4.0]);
        assert!(seasonal_naive_forecast(&s, 0, 1).is_err());
        assert!(seasonal_naive_forecast(&s, 6, 1).is_err());
        assert_eq!(seasonal_naive_forecast(&s, 5, 2).unwrap().values, vec![1.0, 2.0]);
    }

    #[test]
    fn drift_extends_first_to_last_line() {
        let f = drift_forecast(&daily(&[10.0, 0.0, 0.0, 13.0]), 2).unwrap();
        // Slope (13 - 10) / 3 days = 1 per day.
        assert_eq!(f.values, vec![14.0, 15.0]);
    }

    #[test]
    fn drift_on_monthly_uses_elapsed_days() {
        let index = vec![day(2021, 1, 1), day(2021, 2, 1), day(2021, 3, 1)];
        let s = TimeSeries::new("m", index, vec![0.0, 1.0, 59.0]).unwrap();
        let f = drift_forecast(&s, 1).unwrap();
        assert_eq!(f.index, vec![day(2021, 4, 1)]);
        // 59 over 59 days, then 31 more days.
        assert!((f.values[0] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn edge_cases() {
        assert!(naive_forecast(&daily(&[1.0, 2.0]), 0).unwrap().is_empty());
        assert_eq!(naive_forecast(&daily(&[]), 1).unwrap_err().exit_code(), 3);
        let single = daily(&[5.0]);
        assert_eq!(drift_forecast(&single, 1).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn fitted_values_and_residuals() {
        let s = daily(&[1.0, 2.0, 4.0, 7.0]);
        let naive = ForecastMethod::Naive.residuals(&s, 1).unwrap();
        assert!(naive[0].is_nan());
        assert_eq!(&naive[1..], &[1.0, 2.0, 3.0]);

        let seasonal = ForecastMethod::SeasonalNaive.fitted(&s, 2).unwrap();
        assert_eq!(&seasonal[2..], &[1.0, 2.0]);

        // Drift slope is 2 per day.
        let drift = ForecastMethod::Drift.residuals(&s, 1).unwrap();
        assert_eq!(&drift[1..], &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn method_cycle() {
        assert_eq!(ForecastMethod::Drift.next(), ForecastMethod::Naive);
        assert_eq!(ForecastMethod::SeasonalNaive.label(), "seasonal naive");
    }
}
