//! Summary statistics and goodness-of-fit scores.
//!
//! Missing values (NaN) are skipped the way pandas skips them, so these can be
//! applied directly to decomposition components with undefined edges.

use crate::error::AppError;

pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = finite(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Sample variance (`ddof = 1`); NaN with fewer than two finite values.
pub fn variance(values: &[f64]) -> f64 {
    let n = finite(values).count();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    finite(values).map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

pub fn std(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Strength of a trend component relative to the residual, in `[0, 1]`.
pub fn trend_strength(trend: &[f64], resid: &[f64]) -> f64 {
    component_strength(trend, resid)
}

/// Strength of a seasonal component relative to the residual, in `[0, 1]`.
pub fn seasonal_strength(seasonal: &[f64], resid: &[f64]) -> f64 {
    component_strength(seasonal, resid)
}

fn component_strength(component: &[f64], resid: &[f64]) -> f64 {
    let vr = variance(resid);
    let denom = vr + variance(component);
    if !denom.is_finite() || denom <= 0.0 {
        return 0.0;
    }
    (1.0 - vr / denom).max(0.0)
}

/// Coefficient of determination.
///
/// A constant `y` scores 1 when predicted exactly and 0 otherwise.
pub fn r2_score(y: &[f64], yhat: &[f64]) -> Result<f64, AppError> {
    if y.len() != yhat.len() {
        return Err(AppError::data(format!(
            "r2 needs equal lengths (got {} and {}).",
            y.len(),
            yhat.len()
        )));
    }
    if y.is_empty() {
        return Err(AppError::data("r2 needs at least one observation."));
    }
    let m = y.iter().sum::<f64>() / y.len() as f64;
    let ss_res: f64 = y.iter().zip(yhat).map(|(a, b)| (a - b).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|a| (a - m).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// R² penalized for the number of features `p`: `1 − (1 − r2)(n − 1)/(n − p − 1)`.
pub fn adjusted_r2(y: &[f64], yhat: &[f64], n_features: usize) -> Result<f64, AppError> {
    let r2 = r2_score(y, yhat)?;
    let n = y.len();
    if n <= n_features + 1 {
        return Err(AppError::data(format!(
            "Adjusted r2 needs more observations ({n}) than features + 1 ({}).",
            n_features + 1
        )));
    }
    Ok(1.0 - (1.0 - r2) * (n - 1) as f64 / (n - n_features - 1) as f64)
}

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moments_skip_missing() {
        let v = [1.0, f64::NAN, 2.0, 3.0, 4.0];
        assert_eq!(mean(&v), 2.5);
        assert!((variance(&v) - 5.0 / 3.0).abs() < 1e-12);
        assert!(variance(&[1.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn strengths() {
        let resid = [1.0, -1.0, 1.0, -1.0];
        let strong = [0.0, 10.0, 20.0, 30.0];
        assert!(trend_strength(&strong, &resid) > 0.99);
        assert_eq!(seasonal_strength(&[0.0; 4], &[0.0; 4]), 0.0);
        // Component flatter than the residual still floors at zero, never negative.
        assert!(trend_strength(&[0.0; 4], &resid) >= 0.0);
    }

    #[test]
    fn r2_and_adjusted() {
        let y = [1.0, 2.0, 3.0, 4.0, 5.0];
        let yhat = [1.1, 1.9, 3.2, 3.8, 5.0];
        let r2 = r2_score(&y, &yhat).unwrap();
        assert!((r2 - (1.0 - 0.1 / 10.0)).abs() < 1e-12);
        let adj = adjusted_r2(&y, &yhat, 2).unwrap();
        assert!((adj - (1.0 - 0.01 * 4.0 / 2.0)).abs() < 1e-12);
        assert!(adjusted_r2(&y, &yhat, 4).is_err());
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]).unwrap(), 1.0);
        assert!(r2_score(&y, &yhat[..2]).is_err());
    }
}
