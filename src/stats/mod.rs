//! Time-series statistics: moments and fit scores, decomposition,
//! autocorrelation, and stationarity tests.

pub mod acf;
pub mod decompose;
pub mod descriptive;
pub mod mackinnon;
pub mod stationarity;

pub use acf::{acf, acf_band, default_nlags, pacf, pacf_band};
pub use decompose::{Decomposition, decompose_additive};
pub use descriptive::*;
pub use stationarity::{AdfOptions, Autolag, CriticalValue, KpssLags, TestResult, adfuller_test, kpss_test};
