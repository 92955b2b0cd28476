//! Linear algebra helpers: least squares with inference.

pub mod ols;

pub use ols::*;
