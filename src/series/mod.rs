//! Frame-level time operations: resampling to a regular grid and filling gaps.

pub mod fill;
pub mod resample;

pub use fill::*;
pub use resample::*;
