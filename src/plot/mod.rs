//! Charts: plain-text plots for the terminal and SVG files via Plotters.

pub mod ascii;
pub mod svg;

pub use ascii::{render_forecast_plot, render_series_plot};
pub use svg::{plot_autocorrelations, plot_residuals_diagnostics, plot_seasonal_periods, plot_time_series};
