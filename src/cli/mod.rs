//! Command-line parsing for the dives.
//!
//! Argument parsing and command dispatch stay separate from the data and
//! statistics code; `app` turns these structs into pipeline calls.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::datasets::DatasetId;
use crate::domain::{BootstrapStrategy, DatetimeAttr, FillMethod, Frequency, Regression};
use crate::forecast::ForecastMethod;
use crate::stats::{Autolag, KpssLags};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dives", version, about = "Time-series data dives on public climate and air-quality datasets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the available datasets with provenance and citation.
    Datasets(DatasetsArgs),
    /// Download a dataset into the cache (or refresh it with --force).
    Fetch(FetchArgs),
    /// Prepare a dataset and preview or export the resulting frame.
    Prepare(PrepareArgs),
    /// Forecast one column with a benchmark method or a deterministic-feature regression.
    Forecast(ForecastArgs),
    /// Decomposition strengths and stationarity tests for one column.
    Stats(StatsArgs),
    /// Write an SVG chart.
    Plot(PlotArgs),
    /// Launch the interactive TUI.
    Tui(TuiArgs),
}

#[derive(Debug, Args, Clone)]
pub struct DatasetsArgs {
    /// Print the dataset metadata as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Where the raw data lives.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Dataset to use.
    #[arg(value_enum)]
    pub dataset: DatasetId,

    /// Cache directory for raw CSVs (default: $DIVES_DATA_DIR or ./data).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Download again even when a cached copy exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Also copy the raw table to this CSV file.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

/// How the raw table becomes a frame.
#[derive(Debug, Args, Clone)]
pub struct PrepArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Resample to this frequency (e.g. 1D, 3H, MS); defaults per dataset.
    #[arg(long, value_name = "FREQ")]
    pub freq: Option<Frequency>,

    /// Gap filling after resampling; defaults per dataset.
    #[arg(long, value_enum)]
    pub fill: Option<FillMethod>,
}

#[derive(Debug, Args, Clone)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub prep: PrepArgs,

    /// Rows to preview.
    #[arg(long, default_value_t = 10)]
    pub rows: usize,

    /// Export the prepared frame to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub prep: PrepArgs,

    /// Column to forecast (default: the dataset's headline column).
    #[arg(short, long)]
    pub column: Option<String>,

    /// Benchmark method.
    #[arg(short, long, value_enum, default_value_t = ForecastMethod::SeasonalNaive)]
    pub method: ForecastMethod,

    /// Periods to forecast.
    #[arg(short, long, default_value_t = 24)]
    pub steps: usize,

    /// Seasonal period in observations (seasonal naive only).
    #[arg(long, default_value_t = 12)]
    pub period: usize,

    /// Bootstrap replicates for the interval (0 disables intervals).
    #[arg(long, default_value_t = 500)]
    pub replicates: usize,

    #[arg(long, default_value_t = 12)]
    pub block_size: usize,

    #[arg(long, value_enum, default_value_t = BootstrapStrategy::MovingBlock)]
    pub strategy: BootstrapStrategy,

    /// Interval coverage, e.g. 0.9.
    #[arg(long, default_value_t = 0.9)]
    pub level: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fit a regression on deterministic features instead of a benchmark method.
    #[arg(long)]
    pub regression: bool,

    /// Trend knot (YYYY-MM-DD[ HH:MM:SS]); repeatable.
    #[arg(long = "knot", value_name = "DATE")]
    pub knots: Vec<String>,

    /// Calendar attribute to add as seasonal dummies; repeatable.
    #[arg(long = "season", value_enum)]
    pub seasons: Vec<DatetimeAttr>,

    /// Omit the constant from the regression design.
    #[arg(long)]
    pub no_constant: bool,

    /// Only use the last N observations.
    #[arg(long)]
    pub tail: Option<usize>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the forecast to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the forecast to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub prep: PrepArgs,

    #[arg(short, long)]
    pub column: Option<String>,

    /// Seasonal period for the decomposition strengths.
    #[arg(long, default_value_t = 12)]
    pub period: usize,

    /// Deterministic terms in the test regressions.
    #[arg(long, value_enum, default_value_t = Regression::C)]
    pub regression: Regression,

    /// Maximum ADF lag (default: 12·(n/100)^¼).
    #[arg(long)]
    pub maxlag: Option<usize>,

    /// ADF lag selection; `none` uses maxlag directly.
    #[arg(long, value_enum, default_value_t = AutolagArg::Aic)]
    pub autolag: AutolagArg,

    /// KPSS lags: auto, legacy, or a number.
    #[arg(long, default_value = "auto")]
    pub kpss_lags: KpssLags,

    /// Only use the last N observations.
    #[arg(long)]
    pub tail: Option<usize>,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// ADF lag selection including "no search".
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AutolagArg {
    Aic,
    Bic,
    #[value(name = "t-stat")]
    TStat,
    None,
}

impl AutolagArg {
    pub fn to_autolag(self) -> Option<Autolag> {
        match self {
            AutolagArg::Aic => Some(Autolag::Aic),
            AutolagArg::Bic => Some(Autolag::Bic),
            AutolagArg::TStat => Some(Autolag::TStat),
            AutolagArg::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartKind {
    /// Time plot of one or more columns.
    Series,
    /// One line per seasonal period.
    Seasonal,
    /// ACF and PACF correlograms.
    Acf,
    /// Residual diagnostics of a benchmark forecast method.
    Residuals,
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    #[command(flatten)]
    pub prep: PrepArgs,

    #[arg(value_enum)]
    pub kind: ChartKind,

    /// Output SVG file.
    #[arg(short, long, value_name = "SVG")]
    pub out: PathBuf,

    /// Columns to plot; repeatable (default: the headline column).
    #[arg(short, long = "column")]
    pub columns: Vec<String>,

    /// Overlay series on one panel instead of stacking them.
    #[arg(long)]
    pub overlay: bool,

    /// Seasonal chart: attribute that defines a period.
    #[arg(long, value_enum, default_value_t = DatetimeAttr::Year)]
    pub group_by: DatetimeAttr,

    /// Seasonal chart: attribute on the x axis.
    #[arg(long, value_enum, default_value_t = DatetimeAttr::Month)]
    pub x_attr: DatetimeAttr,

    /// Correlogram lags.
    #[arg(long)]
    pub lags: Option<usize>,

    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,

    /// Include lag 0 in correlograms.
    #[arg(long)]
    pub zero: bool,

    /// Residuals chart: benchmark method whose residuals are diagnosed.
    #[arg(long, value_enum, default_value_t = ForecastMethod::Naive)]
    pub method: ForecastMethod,

    #[arg(long, default_value_t = 12)]
    pub period: usize,

    /// Only use the last N observations.
    #[arg(long)]
    pub tail: Option<usize>,

    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    #[arg(long, default_value_t = 640)]
    pub height: u32,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    /// Dataset shown first.
    #[arg(value_enum, default_value_t = DatasetId::Synthetic)]
    pub dataset: DatasetId,

    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Periods to forecast.
    #[arg(short, long, default_value_t = 24)]
    pub steps: usize,

    #[arg(long, default_value_t = 12)]
    pub period: usize,

    #[arg(long, default_value_t = 200)]
    pub replicates: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_flags_parse() {
        let cli = Cli::parse_from([
            "dives", "forecast", "mlo-co2", "--freq", "MS", "-m", "drift", "--knot", "2000-01-01", "--season",
            "month",
        ]);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.prep.source.dataset, DatasetId::MloCo2);
        assert_eq!(args.prep.freq, Some(Frequency::MonthStart(1)));
        assert_eq!(args.method, ForecastMethod::Drift);
        assert_eq!(args.knots, vec!["2000-01-01"]);
        assert_eq!(args.seasons, vec![DatetimeAttr::Month]);
    }

    #[test]
    fn stats_flags_parse() {
        let cli = Cli::parse_from(["dives", "stats", "gistemp", "--kpss-lags", "7", "--autolag", "none"]);
        let Command::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(args.kpss_lags, KpssLags::Fixed(7));
        assert_eq!(args.autolag.to_autolag(), None);
        assert!(Cli::try_parse_from(["dives", "stats", "gistemp", "--freq", "weekly"]).is_err());
    }
}
