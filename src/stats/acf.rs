//! Sample autocorrelation and partial autocorrelation.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::AppError;

/// Lags shown by default for `nobs` observations: `min(ceil(10·log10(n)), n − 1)`.
pub fn default_nlags(nobs: usize) -> usize {
    if nobs < 2 {
        return 0;
    }
    let lags = (10.0 * (nobs as f64).log10()).ceil() as usize;
    lags.min(nobs - 1)
}

/// Biased sample autocorrelation for lags `0..=nlags`.
pub fn acf(values: &[f64], nlags: usize) -> Result<Vec<f64>, AppError> {
    let acov = autocovariance(values, nlags)?;
    if acov[0] == 0.0 {
        return Err(AppError::data("Autocorrelation of a constant series is undefined."));
    }
    Ok(acov.iter().map(|c| c / acov[0]).collect())
}

/// Partial autocorrelation for lags `0..=nlags` (Durbin–Levinson on the biased autocovariances).
pub fn pacf(values: &[f64], nlags: usize) -> Result<Vec<f64>, AppError> {
    let r = acf(values, nlags)?;
    let mut out = vec![1.0; nlags + 1];
    if nlags == 0 {
        return Ok(out);
    }

    let mut phi = vec![r[1]];
    out[1] = r[1];
    for k in 2..=nlags {
        let num = r[k] - (1..k).map(|j| phi[j - 1] * r[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| phi[j - 1] * r[j]).sum::<f64>();
        if den.abs() < f64::EPSILON {
            return Err(AppError::runtime(format!("PACF recursion is singular at lag {k}.")));
        }
        let phi_kk = num / den;
        let mut next: Vec<f64> = (1..k).map(|j| phi[j - 1] - phi_kk * phi[k - j - 1]).collect();
        next.push(phi_kk);
        phi = next;
        out[k] = phi_kk;
    }
    Ok(out)
}

/// Half-widths of the Bartlett confidence band around zero for an ACF.
///
/// Lag 0 has width 0; lag `k` uses `(1 + 2·Σ_{j<k} acf[j]²) / n` as the variance.
pub fn acf_band(acf: &[f64], nobs: usize, alpha: f64) -> Result<Vec<f64>, AppError> {
    let z = critical_z(alpha)?;
    let n = nobs as f64;
    let mut out = Vec::with_capacity(acf.len());
    let mut cum = 0.0;
    for k in 0..acf.len() {
        let var = match k {
            0 => 0.0,
            1 => 1.0 / n,
            _ => {
                cum += acf[k - 1].powi(2);
                (1.0 + 2.0 * cum) / n
            }
        };
        out.push(z * var.sqrt());
    }
    Ok(out)
}

/// Half-widths of the confidence band around zero for a PACF: `z / sqrt(n)`.
pub fn pacf_band(nlags: usize, nobs: usize, alpha: f64) -> Result<Vec<f64>, AppError> {
    let z = critical_z(alpha)?;
    let width = z / (nobs as f64).sqrt();
    Ok((0..=nlags).map(|k| if k == 0 { 0.0 } else { width }).collect())
}

fn autocovariance(values: &[f64], nlags: usize) -> Result<Vec<f64>, AppError> {
    let n = values.len();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::data("Autocorrelation input has missing values."));
    }
    if nlags >= n {
        return Err(AppError::data(format!(
            "Requested {nlags} lags but only {n} observations."
        )));
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let d: Vec<f64> = values.iter().map(|v| v - m).collect();
    Ok((0..=nlags)
        .map(|k| d[k..].iter().zip(&d).map(|(a, b)| a * b).sum::<f64>() / n as f64)
        .collect())
}

fn critical_z(alpha: f64) -> Result<f64, AppError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(AppError::usage(format!("Significance level must be in (0, 1) (got {alpha}).")));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::runtime(format!("Normal distribution error: {e}")))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acf_of_short_series() {
        // Deviations -2, -1, 0, 1, 2: acov0 = 2, acov1 = (2 + 0 + 0 + 2) / 5 = 0.8.
        let r = acf(&[1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
        assert_eq!(r[0], 1.0);
        assert!((r[1] - 0.4).abs() < 1e-12);
        // acov2 = (-2·0 + -1·1 + 0·2) / 5 = -0.2
        assert!((r[2] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn pacf_matches_yule_walker_at_lag_two() {
        let v = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 5.0, 8.0];
        let r = acf(&v, 2).unwrap();
        let p = pacf(&v, 2).unwrap();
        assert_eq!(p[1], r[1]);
        let expected = (r[2] - r[1] * r[1]) / (1.0 - r[1] * r[1]);
        assert!((p[2] - expected).abs() < 1e-12);
    }

    #[test]
    fn bands() {
        let b = acf_band(&[1.0, 0.5, 0.25], 100, 0.05).unwrap();
        assert_eq!(b[0], 0.0);
        assert!((b[1] - 1.959964 * 0.1).abs() < 1e-5);
        assert!((b[2] - 1.959964 * (1.5f64 / 100.0).sqrt()).abs() < 1e-5);
        let p = pacf_band(3, 100, 0.05).unwrap();
        assert_eq!(p.len(), 4);
        assert!((p[3] - 0.1959964).abs() < 1e-5);
        assert!(acf_band(&[1.0], 10, 1.5).is_err());
    }

    #[test]
    fn lag_defaults_and_errors() {
        assert_eq!(default_nlags(100), 20);
        assert_eq!(default_nlags(5), 4);
        assert!(acf(&[1.0, 1.0, 1.0], 1).is_err());
        assert!(acf(&[1.0, 2.0], 2).is_err());
    }
}
