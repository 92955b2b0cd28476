//! Block bootstrap resampling and bootstrap prediction intervals.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{BootstrapStrategy, Frame, TimeSeries};
use crate::error::AppError;
use crate::forecast::naive::{days_between, drift_slope, future_index, ForecastMethod};

/// Row positions for a moving-block resample of `n` rows.
///
/// Block starts are uniform in `0..=n-block`, so every block fits inside
/// the sample.
pub fn moving_block_indexes<R: Rng + ?Sized>(n: usize, block: usize, rng: &mut R) -> Result<Vec<usize>, AppError> {
    check_block(n, block)?;
    Ok(block_indexes(BootstrapStrategy::MovingBlock, n, block, n, rng))
}

/// Row positions for a circular-block resample of `n` rows.
///
/// Starts are uniform in `0..n` and blocks wrap around the end.
pub fn circular_block_indexes<R: Rng + ?Sized>(n: usize, block: usize, rng: &mut R) -> Result<Vec<usize>, AppError> {
    check_block(n, block)?;
    Ok(block_indexes(BootstrapStrategy::CircularBlock, n, block, n, rng))
}

fn check_block(n: usize, block: usize) -> Result<(), AppError> {
    if block == 0 || block > n {
        return Err(AppError::usage(format!(
            "Block size must be between 1 and the sample length {n} (got {block})."
        )));
    }
    Ok(())
}

/// `len` positions drawn from a sample of `n` rows, block by block.
fn block_indexes<R: Rng + ?Sized>(
    strategy: BootstrapStrategy,
    n: usize,
    block: usize,
    len: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut out = Vec::with_capacity(len.div_ceil(block) * block);
    while out.len() < len {
        match strategy {
            BootstrapStrategy::MovingBlock => {
                let start = rng.gen_range(0..=n - block);
                out.extend(start..start + block);
            }
            BootstrapStrategy::CircularBlock => {
                let start = rng.gen_range(0..n);
                out.extend((start..start + block).map(|i| i % n));
            }
        }
    }
    out.truncate(len);
    out
}

/// Anything with rows that can be gathered by position while keeping its index.
pub trait Resample: Sized {
    fn rows(&self) -> usize;
    fn resampled(&self, positions: &[usize]) -> Result<Self, AppError>;
}

impl Resample for TimeSeries {
    fn rows(&self) -> usize {
        self.len()
    }

    fn resampled(&self, positions: &[usize]) -> Result<Self, AppError> {
        self.with_values(positions.iter().map(|&i| self.values[i]).collect())
    }
}

impl Resample for Frame {
    fn rows(&self) -> usize {
        self.len()
    }

    fn resampled(&self, positions: &[usize]) -> Result<Self, AppError> {
        self.with_rows_from(positions)
    }
}

/// Resample equally long series (or frames) with one shared block draw.
///
/// Each output keeps its input's index and name; only the values move.
pub fn bootstrap<T: Resample, R: Rng + ?Sized>(
    arrays: &[T],
    block_size: usize,
    strategy: BootstrapStrategy,
    rng: &mut R,
) -> Result<Vec<T>, AppError> {
    let Some(first) = arrays.first() else {
        return Ok(Vec::new());
    };
    let n = first.rows();
    if let Some(bad) = arrays.iter().find(|a| a.rows() != n) {
        return Err(AppError::data(format!(
            "All inputs must have the same length ({n} vs {}).",
            bad.rows()
        )));
    }
    check_block(n, block_size)?;
    let positions = block_indexes(strategy, n, block_size, n, rng);
    arrays.iter().map(|a| a.resampled(&positions)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapOptions {
    pub replicates: usize,
    pub block_size: usize,
    pub strategy: BootstrapStrategy,
    /// Coverage of the band, e.g. `0.9` for the 5th to 95th percentile.
    pub level: f64,
    pub seed: u64,
    /// Seasonal period for `ForecastMethod::SeasonalNaive`.
    pub period: usize,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            replicates: 500,
            block_size: 12,
            strategy: BootstrapStrategy::MovingBlock,
            level: 0.9,
            seed: 42,
            period: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalForecast {
    pub method: ForecastMethod,
    pub level: f64,
    pub replicates: usize,
    pub point: TimeSeries,
    pub lower: TimeSeries,
    pub upper: TimeSeries,
}

/// Point forecast plus a percentile band from simulated future paths.
///
/// Each replicate draws block-bootstrapped in-sample residuals and adds them
/// to recursive one-step forecasts. Replicate `i` uses its own RNG seeded with
/// `seed + i`, so the band does not depend on the thread count.
pub fn bootstrap_intervals(
    series: &TimeSeries,
    method: ForecastMethod,
    steps: usize,
    options: &BootstrapOptions,
) -> Result<IntervalForecast, AppError> {
    if !(options.level > 0.0 && options.level < 1.0) {
        return Err(AppError::usage(format!(
            "Interval level must be strictly between 0 and 1 (got {}).",
            options.level
        )));
    }
    if options.replicates == 0 {
        return Err(AppError::usage("At least one bootstrap replicate is required."));
    }
    if series.values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::data(format!(
            "Series '{}' has missing values; fill it before forecasting.",
            series.name
        )));
    }

    let point = method.forecast(series, steps, options.period)?;
    let residuals: Vec<f64> = method
        .residuals(series, options.period)?
        .into_iter()
        .filter(|r| r.is_finite())
        .collect();
    if residuals.is_empty() {
        return Err(AppError::data(format!(
            "Series '{}' is too short to estimate residuals.",
            series.name
        )));
    }
    check_block(residuals.len(), options.block_size)?;

    let slope = match method {
        ForecastMethod::Drift => drift_slope(series)?,
        _ => 0.0,
    };
    let future = future_index(series, steps)?;
    let mut prev = series.index[series.len() - 1];
    let dt_days: Vec<f64> = future
        .iter()
        .map(|&t| {
            let dt = days_between(prev, t);
            prev = t;
            dt
        })
        .collect();

    log::debug!(
        "bootstrap '{}': {} replicates of {steps} steps, {} residuals, block {} ({})",
        series.name,
        options.replicates,
        residuals.len(),
        options.block_size,
        options.strategy.label()
    );

    let paths: Vec<Vec<f64>> = (0..options.replicates)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(i as u64));
            let draws = block_indexes(options.strategy, residuals.len(), options.block_size, steps, &mut rng);
            let mut path = series.values.clone();
            for (k, &r) in draws.iter().enumerate() {
                let next = method.step(&path, options.period, slope, dt_days[k]) + residuals[r];
                path.push(next);
            }
            path.split_off(series.len())
        })
        .collect();

    let alpha = (1.0 - options.level) / 2.0;
    let mut lower = Vec::with_capacity(steps);
    let mut upper = Vec::with_capacity(steps);
    let mut column = Vec::with_capacity(paths.len());
    for k in 0..steps {
        column.clear();
        column.extend(paths.iter().map(|p| p[k]));
        column.sort_by(|a, b| a.total_cmp(b));
        lower.push(quantile_sorted(&column, alpha));
        upper.push(quantile_sorted(&column, 1.0 - alpha));
    }

    Ok(IntervalForecast {
        method,
        level: options.level,
        replicates: options.replicates,
        lower: point.with_values(lower)?.renamed(format!("{}_lower", series.name)),
        upper: point.with_values(upper)?.renamed(format!("{}_upper", series.name)),
        point,
    })
}

/// Linear-interpolated quantile of sorted values.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}
