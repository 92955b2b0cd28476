//! Ordinary least squares.
//!
//! Design matrices here are small and tall (a few hundred to a few tens of
//! thousands of rows, at most a few dozen columns), so everything goes through
//! an SVD:
//!
//! - `solve_least_squares` gives the coefficients only.
//! - `fit_ols` adds what the unit-root tests and the regression dive need:
//!   residual sum of squares, standard errors, t statistics, log-likelihood,
//!   and AIC.
//!
//! `(XᵀX)⁻¹` is taken as `X⁺ (X⁺)ᵀ`, which stays defined when columns are
//! nearly collinear (e.g. several knot terms close together).

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Singular values below this fraction of the largest count as zero.
const RANK_TOL: f64 = 1e-10;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Result of an OLS fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub params: DVector<f64>,
    pub bse: DVector<f64>,
    pub tvalues: DVector<f64>,
    pub fitted: DVector<f64>,
    pub resid: DVector<f64>,
    pub ssr: f64,
    pub nobs: usize,
    pub rank: usize,
    pub df_resid: usize,
    pub llf: f64,
    pub aic: f64,
}

/// Fit `y ~ X` by OLS, with Gaussian log-likelihood and AIC.
pub fn fit_ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit, AppError> {
    let nobs = x.nrows();
    if nobs != y.len() {
        return Err(AppError::data(format!(
            "Design has {nobs} rows but the response has {}.",
            y.len()
        )));
    }
    if x.ncols() == 0 || nobs <= x.ncols() {
        return Err(AppError::data(format!(
            "Need more observations ({nobs}) than regressors ({}).",
            x.ncols()
        )));
    }

    let params = solve_least_squares(x, y)
        .ok_or_else(|| AppError::runtime("Least squares system is too ill-conditioned to solve."))?;
    let fitted = x * &params;
    let resid = y - &fitted;
    let ssr = resid.norm_squared();

    let svd = x.clone().svd(false, false);
    let max_sv = svd.singular_values.max();
    let rank = svd
        .singular_values
        .iter()
        .filter(|&&s| s > max_sv * RANK_TOL)
        .count();
    let df_resid = nobs.saturating_sub(rank);
    if df_resid == 0 {
        return Err(AppError::data("No residual degrees of freedom left."));
    }

    let pinv = x
        .clone()
        .pseudo_inverse(max_sv * RANK_TOL)
        .map_err(|e| AppError::runtime(format!("Pseudo-inverse failed: {e}")))?;
    let xtx_inv = &pinv * pinv.transpose();
    let scale = ssr / df_resid as f64;
    let bse = DVector::from_iterator(
        params.len(),
        (0..params.len()).map(|i| (xtx_inv[(i, i)] * scale).max(0.0).sqrt()),
    );
    let tvalues = params.zip_map(&bse, |b, se| if se > 0.0 { b / se } else { f64::NAN });

    let n = nobs as f64;
    let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / n).ln() + 1.0);
    let aic = -2.0 * llf + 2.0 * rank as f64;

    Ok(OlsFit {
        params,
        bse,
        tvalues,
        fitted,
        resid,
        ssr,
        nobs,
        rank,
        df_resid,
        llf,
        aic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn standard_errors_match_closed_form() {
        // Simple regression on x = 0..5 with residuals ±0.5.
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let noise = [0.5, -0.5, 0.5, -0.5, 0.5];
        let x = DMatrix::from_fn(5, 2, |i, j| if j == 0 { 1.0 } else { xs[i] });
        let y = DVector::from_iterator(5, xs.iter().zip(noise).map(|(x, e)| 1.0 + 2.0 * x + e));

        let fit = fit_ols(&x, &y).unwrap();
        assert_eq!(fit.rank, 2);
        assert_eq!(fit.df_resid, 3);

        // Closed form: se(slope) = sqrt(s² / Sxx), Sxx = 10.
        let s2 = fit.ssr / 3.0;
        assert!((fit.bse[1] - (s2 / 10.0).sqrt()).abs() < 1e-10);
        assert!((fit.tvalues[1] - fit.params[1] / fit.bse[1]).abs() < 1e-12);

        let n = 5.0;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (fit.ssr / n).ln() + 1.0);
        assert!((fit.llf - llf).abs() < 1e-12);
        assert!((fit.aic - (-2.0 * llf + 4.0)).abs() < 1e-12);
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let x = DMatrix::from_element(2, 2, 1.0);
        let y = DVector::from_element(2, 1.0);
        assert_eq!(fit_ols(&x, &y).unwrap_err().exit_code(), 3);
    }
}
