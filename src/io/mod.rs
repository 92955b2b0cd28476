//! Input/output helpers: CSV and JSON exports of frames and forecasts.

pub mod export;

pub use export::*;
