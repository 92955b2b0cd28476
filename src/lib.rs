//! `data-dives` library crate.
//!
//! The binary (`dives`) is a thin wrapper around this library so that:
//!
//! - dataset loading, forecasting and the statistical tests are testable
//!   without spawning processes
//! - the CLI and the TUI share one pipeline

pub mod app;
pub mod cli;
pub mod config;
pub mod datasets;
pub mod domain;
pub mod error;
pub mod features;
pub mod forecast;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod series;
pub mod stats;
pub mod tui;
