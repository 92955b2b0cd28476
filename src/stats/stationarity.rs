//! Unit-root (ADF) and stationarity (KPSS) tests.
//!
//! The two tests have opposite null hypotheses: ADF's null is a unit root, so
//! a small p-value means stationary; KPSS's null is stationarity, so a small
//! p-value means non-stationary. `TestResult::stationary` already accounts for
//! that at the 5% level.

use std::str::FromStr;

use clap::ValueEnum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::{Regression, TimeSeries};
use crate::error::AppError;
use crate::math::{OlsFit, fit_ols};
use crate::stats::mackinnon::{CRIT_LEVELS, mackinnon_crit, mackinnon_p};

/// Significance level used to call a series stationary.
const SIGNIFICANCE: f64 = 0.05;

/// One-sided 5% normal quantile, the stopping rule of the t-stat lag search.
const TSTAT_STOP: f64 = 1.6448536269514722;

const KPSS_P: [f64; 4] = [0.10, 0.05, 0.025, 0.01];
const KPSS_LEVELS: [&str; 4] = ["10%", "5%", "2.5%", "1%"];
const KPSS_CRIT_C: [f64; 4] = [0.347, 0.463, 0.574, 0.739];
const KPSS_CRIT_CT: [f64; 4] = [0.119, 0.146, 0.176, 0.216];

/// Information criterion for ADF lag selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Autolag {
    Aic,
    Bic,
    /// Drop lags from the top until the last one is significant.
    #[value(name = "t-stat")]
    #[serde(rename = "t-stat")]
    TStat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdfOptions {
    pub regression: Regression,
    /// Largest lag considered; `None` uses `ceil(12·(n/100)^¼)`, capped for short series.
    pub maxlag: Option<usize>,
    /// `None` uses exactly `maxlag` lags.
    pub autolag: Option<Autolag>,
}

impl Default for AdfOptions {
    fn default() -> Self {
        Self {
            regression: Regression::C,
            maxlag: None,
            autolag: Some(Autolag::Aic),
        }
    }
}

/// Bandwidth choice for the KPSS long-run variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpssLags {
    /// Data-dependent bandwidth of Hobijn et al. (1998).
    Auto,
    /// `ceil(12·(n/100)^¼)`.
    Legacy,
    Fixed(usize),
}

impl FromStr for KpssLags {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(KpssLags::Auto),
            "legacy" => Ok(KpssLags::Legacy),
            other => other.parse::<usize>().map(KpssLags::Fixed).map_err(|_| {
                AppError::usage(format!("Invalid KPSS lags '{other}' (expected auto, legacy, or a number)."))
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalValue {
    pub level: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub test: &'static str,
    pub stationary: bool,
    pub statistic: f64,
    pub p_value: f64,
    pub lags: usize,
    /// Observations in the test regression (ADF only).
    pub nobs: Option<usize>,
    pub critical_values: Vec<CriticalValue>,
    /// Best information criterion value when the ADF lag was searched.
    pub icbest: Option<f64>,
}

/// Augmented Dickey–Fuller unit-root test.
pub fn adfuller_test(series: &TimeSeries, options: &AdfOptions) -> Result<TestResult, AppError> {
    let x = complete_values(series)?;
    let n = x.len();
    let ntrend = options.regression.n_trend();

    let cap = (n / 2) as i64 - ntrend as i64 - 1;
    if cap < 0 {
        return Err(AppError::data(format!(
            "Series '{}' ({n} obs) is too short for an ADF test with regression '{}'.",
            series.name,
            options.regression.code()
        )));
    }
    let maxlag = match options.maxlag {
        Some(m) if m as i64 > cap => {
            return Err(AppError::usage(format!(
                "ADF maxlag must be <= {cap} for {n} observations (got {m})."
            )));
        }
        Some(m) => m,
        None => (schwert_lags(n) as i64).min(cap) as usize,
    };

    let (usedlag, icbest) = match options.autolag {
        Some(method) => {
            let (level_and_lags, y) = adf_design(&x, maxlag);
            let full = with_trend(&level_and_lags, options.regression, true);
            let startlag = ntrend + 1;
            let (best, ic) = select_lag(&full, &y, startlag, maxlag, method)?;
            (best, Some(ic))
        }
        None => (maxlag, None),
    };

    let (level_and_lags, y) = adf_design(&x, usedlag);
    let design = with_trend(&level_and_lags, options.regression, false);
    let fit = fit_ols(&design, &y)?;
    let statistic = fit.tvalues[0];
    let p_value = mackinnon_p(statistic, options.regression)?;
    let nobs = y.len();
    let crit = mackinnon_crit(options.regression, nobs);

    log::debug!(
        "adf '{}': lag {usedlag} of max {maxlag}, stat {statistic:.4}, p {p_value:.4}",
        series.name
    );

    Ok(TestResult {
        test: "ADF",
        stationary: p_value < SIGNIFICANCE,
        statistic,
        p_value,
        lags: usedlag,
        nobs: Some(nobs),
        critical_values: CRIT_LEVELS
            .iter()
            .zip(crit)
            .map(|(&level, value)| CriticalValue { level, value })
            .collect(),
        icbest,
    })
}

/// Kwiatkowski–Phillips–Schmidt–Shin stationarity test.
///
/// The p-value is interpolated in the published table, so it is clipped to
/// `[0.01, 0.10]`.
pub fn kpss_test(series: &TimeSeries, regression: Regression, nlags: KpssLags) -> Result<TestResult, AppError> {
    let x = complete_values(series)?;
    let n = x.len();
    if n < 3 {
        return Err(AppError::data(format!(
            "Series '{}' ({n} obs) is too short for a KPSS test.",
            series.name
        )));
    }

    let (resid, crit) = match regression {
        Regression::N => {
            return Err(AppError::usage("KPSS supports regression 'c' or 'ct' only."));
        }
        Regression::C => {
            let m = x.iter().sum::<f64>() / n as f64;
            (x.iter().map(|v| v - m).collect::<Vec<f64>>(), KPSS_CRIT_C)
        }
        Regression::Ct => {
            let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { (i + 1) as f64 });
            let fit = fit_ols(&design, &DVector::from_vec(x.clone()))?;
            (fit.resid.iter().copied().collect(), KPSS_CRIT_CT)
        }
    };

    let lags = match nlags {
        KpssLags::Auto => hobijn_lags(&resid).min(n - 1),
        KpssLags::Legacy => schwert_lags(n).min(n - 1),
        KpssLags::Fixed(l) if l >= n => {
            return Err(AppError::usage(format!("KPSS lags must be < {n} (got {l}).")));
        }
        KpssLags::Fixed(l) => l,
    };

    let mut partial = 0.0;
    let eta = resid
        .iter()
        .map(|r| {
            partial += r;
            partial * partial
        })
        .sum::<f64>()
        / (n * n) as f64;
    let s_hat = long_run_variance(&resid, lags);
    if s_hat.is_nan() || s_hat <= 0.0 {
        return Err(AppError::runtime(format!(
            "KPSS long-run variance is not positive for '{}'.",
            series.name
        )));
    }
    let statistic = eta / s_hat;
    let p_value = interp(statistic, &crit, &KPSS_P);

    log::debug!("kpss '{}': lags {lags}, stat {statistic:.4}, p {p_value:.4}", series.name);

    Ok(TestResult {
        test: "KPSS",
        stationary: p_value > SIGNIFICANCE,
        statistic,
        p_value,
        lags,
        nobs: None,
        critical_values: KPSS_LEVELS
            .iter()
            .zip(crit)
            .map(|(&level, value)| CriticalValue { level, value })
            .collect(),
        icbest: None,
    })
}

fn complete_values(series: &TimeSeries) -> Result<Vec<f64>, AppError> {
    if series.values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::data(format!(
            "Series '{}' has missing values; fill or drop them first.",
            series.name
        )));
    }
    Ok(series.values.clone())
}

/// `ceil(12·(n/100)^¼)`
fn schwert_lags(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Level column followed by `lags` lagged differences, and the differenced response.
fn adf_design(x: &[f64], lags: usize) -> (DMatrix<f64>, DVector<f64>) {
    let xdiff: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let nobs = xdiff.len() - lags;
    let design = DMatrix::from_fn(nobs, lags + 1, |r, c| {
        let t = lags + r;
        if c == 0 { x[t] } else { xdiff[t - c] }
    });
    let y = DVector::from_iterator(nobs, xdiff[lags..].iter().copied());
    (design, y)
}

/// Add constant / trend columns before or after the existing ones.
fn with_trend(base: &DMatrix<f64>, regression: Regression, prepend: bool) -> DMatrix<f64> {
    let k = regression.n_trend();
    let (rows, cols) = base.shape();
    let start = if prepend { 0 } else { cols };
    DMatrix::from_fn(rows, cols + k, |r, c| {
        if (start..start + k).contains(&c) {
            if c == start { 1.0 } else { (r + 1) as f64 }
        } else if prepend {
            base[(r, c - k)]
        } else {
            base[(r, c)]
        }
    })
}

/// Fit the first `startlag..=startlag + maxlag` columns and keep the best lag.
fn select_lag(
    full: &DMatrix<f64>,
    y: &DVector<f64>,
    startlag: usize,
    maxlag: usize,
    method: Autolag,
) -> Result<(usize, f64), AppError> {
    let mut fits: Vec<(usize, OlsFit)> = Vec::with_capacity(maxlag + 1);
    for ncols in startlag..=startlag + maxlag {
        let exog = full.columns(0, ncols).into_owned();
        fits.push((ncols, fit_ols(&exog, y)?));
    }

    let (best, ic) = match method {
        Autolag::Aic | Autolag::Bic => {
            let mut best: Option<(usize, f64)> = None;
            for (ncols, fit) in &fits {
                let ic = match method {
                    Autolag::Aic => fit.aic,
                    _ => -2.0 * fit.llf + (fit.nobs as f64).ln() * fit.rank as f64,
                };
                if best.is_none_or(|(_, b)| ic < b) {
                    best = Some((*ncols, ic));
                }
            }
            best.ok_or_else(|| AppError::runtime("ADF lag search produced no fits."))?
        }
        Autolag::TStat => {
            let mut chosen = (startlag + maxlag, 0.0);
            for (ncols, fit) in fits.iter().rev() {
                let t = fit.tvalues[fit.tvalues.len() - 1].abs();
                chosen = (*ncols, t);
                if t >= TSTAT_STOP {
                    break;
                }
            }
            chosen
        }
    };
    Ok((best - startlag, ic))
}

/// Bartlett-weighted long-run variance of `resid` with `lags` autocovariances.
fn long_run_variance(resid: &[f64], lags: usize) -> f64 {
    let n = resid.len();
    let mut s = resid.iter().map(|r| r * r).sum::<f64>();
    for i in 1..=lags {
        let prod: f64 = resid[i..].iter().zip(resid).map(|(a, b)| a * b).sum();
        s += 2.0 * prod * (1.0 - i as f64 / (lags as f64 + 1.0));
    }
    s / n as f64
}

/// Hobijn, Franses & Ooms (1998) automatic bandwidth.
fn hobijn_lags(resid: &[f64]) -> usize {
    let n = resid.len();
    let covlags = (n as f64).powf(2.0 / 9.0) as usize;
    let mut s0 = resid.iter().map(|r| r * r).sum::<f64>() / n as f64;
    let mut s1 = 0.0;
    for i in 1..=covlags.min(n - 1) {
        let prod: f64 = resid[i..].iter().zip(resid).map(|(a, b)| a * b).sum::<f64>() / (n as f64 / 2.0);
        s0 += prod;
        s1 += i as f64 * prod;
    }
    let ratio = s1 / s0;
    let gamma = 1.1447 * (ratio * ratio).powf(1.0 / 3.0);
    let lags = gamma * (n as f64).powf(1.0 / 3.0);
    if lags.is_finite() && lags > 0.0 { lags as usize } else { 0 }
}

/// Piecewise-linear interpolation of `x` in increasing `xp`, clamped at the ends.
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    if x <= xp[0] {
        return fp[0];
    }
    let last = xp.len() - 1;
    if x >= xp[last] {
        return fp[last];
    }
    let i = xp.windows(2).position(|w| x >= w[0] && x < w[1]).unwrap_or(last - 1);
    let u = (x - xp[i]) / (xp[i + 1] - xp[i]);
    fp[i] + u * (fp[i + 1] - fp[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn daily(values: Vec<f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let index = (0..values.len()).map(|i| start + Duration::days(i as i64)).collect();
        TimeSeries::new("x", index, values).unwrap()
    }

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn random_walk(n: usize, seed: u64) -> Vec<f64> {
        let mut level = 0.0;
        white_noise(n, seed)
            .into_iter()
            .map(|e| {
                level += e;
                level
            })
            .collect()
    }

    #[test]
    fn adf_fixed_lag_matches_hand_computation() {
        let series = daily(vec![1.0, 0.5, 0.5, -0.25, 0.25]);
        let options = AdfOptions {
            regression: Regression::N,
            maxlag: Some(0),
            autolag: None,
        };
        let result = adfuller_test(&series, &options).unwrap();
        assert!((result.statistic - (-2.131754840084772)).abs() < 1e-9);
        assert_eq!(result.lags, 0);
        assert_eq!(result.nobs, Some(4));
        assert_eq!(result.critical_values.len(), 3);
        assert_eq!(result.icbest, None);
    }

    #[test]
    fn adf_white_noise_is_stationary() {
        let series = daily(white_noise(500, 7));
        for regression in [Regression::C, Regression::Ct] {
            let result = adfuller_test(
                &series,
                &AdfOptions {
                    regression,
                    ..AdfOptions::default()
                },
            )
            .unwrap();
            assert!(result.stationary, "{result:?}");
            assert!(result.p_value < 0.01);
            assert!(result.lags <= 18);
            assert_eq!(result.nobs, Some(499 - result.lags));
            assert!(result.icbest.is_some());
            assert!(result.statistic < result.critical_values[0].value);
        }
    }

    #[test]
    fn adf_tstat_lag_search_runs() {
        let series = daily(white_noise(200, 3));
        let result = adfuller_test(
            &series,
            &AdfOptions {
                regression: Regression::C,
                maxlag: Some(6),
                autolag: Some(Autolag::TStat),
            },
        )
        .unwrap();
        assert!(result.lags <= 6);
    }

    #[test]
    fn adf_rejects_short_series_and_large_maxlag() {
        assert_eq!(
            adfuller_test(&daily(vec![1.0, 2.0]), &AdfOptions::default()).unwrap_err().exit_code(),
            3
        );
        let options = AdfOptions {
            maxlag: Some(50),
            ..AdfOptions::default()
        };
        assert_eq!(adfuller_test(&daily(white_noise(40, 1)), &options).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn kpss_matches_hand_computation() {
        // Demeaned [-2, -1, 0, 1, 2]: eta = 26 / 25, long-run variance 10 / 5.
        let result = kpss_test(&daily(vec![1.0, 2.0, 3.0, 4.0, 5.0]), Regression::C, KpssLags::Fixed(0)).unwrap();
        assert!((result.statistic - 0.52).abs() < 1e-12);
        assert!((result.p_value - (0.05 - 0.025 * 0.057 / 0.111)).abs() < 1e-9);
        assert!(!result.stationary);
        assert_eq!(result.critical_values[1].level, "5%");
    }

    #[test]
    fn kpss_random_walk_is_not_stationary() {
        let series = daily(random_walk(500, 11));
        for regression in [Regression::C, Regression::Ct] {
            let result = kpss_test(&series, regression, KpssLags::Auto).unwrap();
            assert_eq!(result.p_value, 0.01);
            assert!(!result.stationary);
        }
        let legacy = kpss_test(&series, Regression::C, KpssLags::Legacy).unwrap();
        assert_eq!(legacy.lags, 18);
    }

    #[test]
    fn kpss_argument_errors() {
        let series = daily(white_noise(20, 2));
        assert!(kpss_test(&series, Regression::N, KpssLags::Auto).is_err());
        assert!(kpss_test(&series, Regression::C, KpssLags::Fixed(20)).is_err());
        assert_eq!("legacy".parse::<KpssLags>().unwrap(), KpssLags::Legacy);
        assert_eq!("4".parse::<KpssLags>().unwrap(), KpssLags::Fixed(4));
        assert!("x".parse::<KpssLags>().is_err());
    }

    #[test]
    fn trend_columns_placement() {
        let base = DMatrix::from_row_slice(2, 1, &[5.0, 6.0]);
        let pre = with_trend(&base, Regression::Ct, true);
        assert_eq!(pre, DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 5.0, 1.0, 2.0, 6.0]));
        let post = with_trend(&base, Regression::C, false);
        assert_eq!(post, DMatrix::from_row_slice(2, 2, &[5.0, 1.0, 6.0, 1.0]));
    }

    #[test]
    fn interpolation_clamps() {
        assert_eq!(interp(0.1, &KPSS_CRIT_C, &KPSS_P), 0.10);
        assert_eq!(interp(5.0, &KPSS_CRIT_C, &KPSS_P), 0.01);
    }
}
