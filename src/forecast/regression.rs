//! Linear regression on deterministic features (trend knots, calendar dummies).

use nalgebra::DVector;

use crate::domain::TimeSeries;
use crate::error::AppError;
use crate::features::DeterministicProcess;
use crate::math::fit_ols;
use crate::stats::{adjusted_r2, r2_score};

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionForecast {
    /// Design column names, in `params` order.
    pub names: Vec<String>,
    pub params: Vec<f64>,
    pub fitted: TimeSeries,
    pub residuals: TimeSeries,
    pub forecast: TimeSeries,
    pub r2: f64,
    pub adjusted_r2: f64,
}

impl RegressionForecast {
    pub fn param(&self, name: &str) -> Option<f64> {
        let pos = self.names.iter().position(|n| n == name)?;
        Some(self.params[pos])
    }
}

/// Fit `series ~ process` by OLS and extend it `steps` periods ahead.
///
/// The process must be built on the series' own index. Adjusted R² counts
/// every design column except the constant as a feature.
pub fn regression_forecast(
    series: &TimeSeries,
    process: &DeterministicProcess,
    steps: usize,
) -> Result<RegressionForecast, AppError> {
    if process.index() != series.index.as_slice() {
        return Err(AppError::data(format!(
            "Feature index does not match series '{}'.",
            series.name
        )));
    }
    if series.values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::data(format!(
            "Series '{}' has missing values; fill it before fitting.",
            series.name
        )));
    }

    let design = process.in_sample()?;
    let y = DVector::from_column_slice(&series.values);
    let ols = fit_ols(&design.values, &y)?;

    let fitted: Vec<f64> = ols.fitted.iter().copied().collect();
    let n_features = design.names.iter().filter(|n| n.as_str() != "const").count();
    let r2 = r2_score(&series.values, &fitted)?;
    let adjusted = adjusted_r2(&series.values, &fitted, n_features)?;

    let future = process.out_of_sample(steps, None)?;
    let predicted = &future.values * &ols.params;
    let mut forecast = TimeSeries::new(series.name.clone(), future.index, predicted.iter().copied().collect())?;
    forecast.freq = series.freq.or(forecast.freq);

    log::debug!(
        "regression '{}': {} columns, r2 {r2:.4}, adjusted {adjusted:.4}",
        series.name,
        design.ncols()
    );

    Ok(RegressionForecast {
        names: design.names,
        params: ols.params.iter().copied().collect(),
        residuals: series.with_values(ols.resid.iter().copied().collect())?.renamed(format!("{}_resid", series.name)),
        fitted: series.with_values(fitted)?.renamed(format!("{}_fitted", series.name)),
        forecast,
        r2,
        adjusted_r2: adjusted,
    })
}
