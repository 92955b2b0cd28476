//! Forecasting: benchmark methods, block bootstrap intervals, and
//! deterministic-feature regression.

pub mod bootstrap;
pub mod naive;
pub mod regression;

pub use bootstrap::{
    bootstrap, bootstrap_intervals, circular_block_indexes, moving_block_indexes, BootstrapOptions,
    IntervalForecast, Resample,
};
pub use naive::{drift_forecast, future_index, naive_forecast, seasonal_naive_forecast, ForecastMethod};
pub use regression::{regression_forecast, RegressionForecast};
