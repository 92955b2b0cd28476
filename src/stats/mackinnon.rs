//! Response-surface approximations for Dickey–Fuller distributions (one series).
//!
//! p-values: MacKinnon (1994), "Approximate asymptotic distribution functions
//! for unit-root and cointegration tests". Critical values: MacKinnon (2010),
//! "Critical values for cointegration tests", finite-sample corrected.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::domain::Regression;
use crate::error::AppError;

struct PTable {
    max: f64,
    min: f64,
    star: f64,
    small_p: [f64; 3],
    large_p: [f64; 4],
}

const P_N: PTable = PTable {
    max: f64::INFINITY,
    min: -19.04,
    star: -1.04,
    small_p: [0.6344, 1.2378, 0.032496],
    large_p: [0.4797, 0.93557, -0.06999, 0.033066],
};

const P_C: PTable = PTable {
    max: 2.74,
    min: -18.83,
    star: -1.61,
    small_p: [2.1659, 1.4412, 0.038269],
    large_p: [1.7339, 0.93202, -0.12745, -0.010368],
};

const P_CT: PTable = PTable {
    max: 0.7,
    min: -16.18,
    star: -2.89,
    small_p: [3.2512, 1.6047, 0.049588],
    large_p: [2.5261, 0.61654, -0.37956, -0.060285],
};

/// `[1%, 5%, 10%]` rows of `c0 + c1/n + c2/n² + c3/n³`.
const CRIT_N: [[f64; 4]; 3] = [
    [-2.56574, -2.2358, -3.627, 0.0],
    [-1.94100, -0.2686, -3.365, 31.223],
    [-1.61682, 0.2656, -2.714, 25.364],
];

const CRIT_C: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

const CRIT_CT: [[f64; 4]; 3] = [
    [-3.95877, -9.0531, -28.428, -134.155],
    [-3.41049, -4.3904, -9.036, -45.374],
    [-3.12705, -2.5856, -3.925, -22.380],
];

pub const CRIT_LEVELS: [&str; 3] = ["1%", "5%", "10%"];

/// Approximate p-value of a Dickey–Fuller t statistic.
pub fn mackinnon_p(stat: f64, regression: Regression) -> Result<f64, AppError> {
    let table = match regression {
        Regression::N => &P_N,
        Regression::C => &P_C,
        Regression::Ct => &P_CT,
    };
    if stat.is_nan() {
        return Err(AppError::runtime("Test statistic is undefined."));
    }
    if stat > table.max {
        return Ok(1.0);
    }
    if stat < table.min {
        return Ok(0.0);
    }
    let z = if stat <= table.star {
        polyval(&table.small_p, stat)
    } else {
        polyval(&table.large_p, stat)
    };
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::runtime(format!("Normal distribution error: {e}")))?;
    Ok(normal.cdf(z))
}

/// Critical values at 1%, 5%, and 10% for a sample of `nobs` observations.
pub fn mackinnon_crit(regression: Regression, nobs: usize) -> [f64; 3] {
    let table = match regression {
        Regression::N => CRIT_N,
        Regression::C => CRIT_C,
        Regression::Ct => CRIT_CT,
    };
    let inv = 1.0 / nobs as f64;
    table.map(|row| polyval(&row, inv))
}

/// `Σ coef[i]·xⁱ`, coefficients in ascending order.
fn polyval(coef: &[f64], x: f64) -> f64 {
    coef.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
