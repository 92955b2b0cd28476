//! Classical additive decomposition: `y = trend + seasonal + resid`.

use crate::domain::TimeSeries;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub observed: TimeSeries,
    /// Centered moving average; undefined (NaN) for the first and last half-window.
    pub trend: TimeSeries,
    pub seasonal: TimeSeries,
    pub resid: TimeSeries,
    pub period: usize,
}

/// Decompose `series` with a centered moving average of width `period`.
///
/// Even periods use the `2×m` average (half weights on both ends). Seasonal
/// effects are the per-position means of the detrended series, shifted to sum
/// to zero over one period.
pub fn decompose_additive(series: &TimeSeries, period: usize) -> Result<Decomposition, AppError> {
    if period < 2 {
        return Err(AppError::usage(format!("Decomposition period must be >= 2 (got {period}).")));
    }
    let n = series.len();
    if n < 2 * period {
        return Err(AppError::data(format!(
            "Decomposition needs two full periods ({} rows), series '{}' has {n}.",
            2 * period,
            series.name
        )));
    }
    if series.values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::data(format!(
            "Series '{}' has missing values; fill them before decomposing.",
            series.name
        )));
    }

    let trend = centered_moving_average(&series.values, period);
    let detrended: Vec<f64> = series.values.iter().zip(&trend).map(|(y, t)| y - t).collect();

    let mut averages = vec![0.0; period];
    for (pos, avg) in averages.iter_mut().enumerate() {
        let (sum, count) = detrended
            .iter()
            .skip(pos)
            .step_by(period)
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        *avg = if count == 0 { 0.0 } else { sum / count as f64 };
    }
    let shift = averages.iter().sum::<f64>() / period as f64;
    for avg in averages.iter_mut() {
        *avg -= shift;
    }

    let seasonal: Vec<f64> = (0..n).map(|i| averages[i % period]).collect();
    let resid: Vec<f64> = detrended.iter().zip(&seasonal).map(|(d, s)| d - s).collect();

    Ok(Decomposition {
        observed: series.clone(),
        trend: series.with_values(trend)?.renamed("trend"),
        seasonal: series.with_values(seasonal)?.renamed("seasonal"),
        resid: series.with_values(resid)?.renamed("resid"),
        period,
    })
}

fn centered_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let weights: Vec<f64> = if period % 2 == 0 {
        let mut w = vec![1.0 / period as f64; period + 1];
        w[0] = 0.5 / period as f64;
        w[period] = 0.5 / period as f64;
        w
    } else {
        vec![1.0 / period as f64; period]
    };
    let half = weights.len() / 2;
    let n = values.len();

    let mut out = vec![f64::NAN; n];
    for (i, slot) in out.iter_mut().enumerate().take(n.saturating_sub(half)).skip(half) {
        *slot = weights
            .iter()
            .enumerate()
            .map(|(k, w)| w * values[i + k - half])
            .sum();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly(values: Vec<f64>) -> TimeSeries {
        let index = (0..values.len())
            .map(|i| {
                NaiveDate::from_ymd_opt(2000 + (i / 12) as i32, (i % 12) as u32 + 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            })
            .collect();
        TimeSeries::new("y", index, values).unwrap()
    }

    #[test]
    fn recovers_trend_and_season() {
        let pattern = [3.0, -1.0, -2.0, 0.0];
        let values: Vec<f64> = (0..24).map(|i| 0.5 * i as f64 + pattern[i % 4]).collect();
        let d = decompose_additive(&monthly(values), 4).unwrap();

        assert!(d.trend.values[..2].iter().all(|v| v.is_nan()));
        assert!(d.trend.values[22..].iter().all(|v| v.is_nan()));
        // A 2x4 average passes a straight line through unchanged.
        for i in 2..22 {
            assert!((d.trend.values[i] - 0.5 * i as f64).abs() < 1e-12);
        }
        for i in 0..4 {
            assert!((d.seasonal.values[i] - pattern[i]).abs() < 1e-12);
        }
        assert!(d.resid.values[2..22].iter().all(|r| r.abs() < 1e-12));
        assert_eq!(d.seasonal.name, "seasonal");
    }

    #[test]
    fn odd_period_window() {
        let ma = centered_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(ma[0].is_nan() && ma[4].is_nan());
        assert_eq!(&ma[1..4], &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn rejects_short_or_gappy_input() {
        assert!(decompose_additive(&monthly(vec![1.0; 5]), 4).is_err());
        let mut v = vec![1.0; 12];
        v[3] = f64::NAN;
        assert_eq!(decompose_additive(&monthly(v), 4).unwrap_err().exit_code(), 3);
        assert_eq!(decompose_additive(&monthly(vec![1.0; 12]), 1).unwrap_err().exit_code(), 2);
    }
}
