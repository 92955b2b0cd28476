//! Domain types used throughout the dives.
//!
//! This module defines:
//!
//! - configuration enums (`FillMethod`, `BootstrapStrategy`, `DatetimeAttr`, ...)
//! - calendar frequencies (`Frequency`)
//! - time-indexed containers (`TimeSeries`, `Frame`)

pub mod frame;
pub mod frequency;
pub mod types;

pub use frame::*;
pub use frequency::*;
pub use types::*;
