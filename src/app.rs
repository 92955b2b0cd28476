//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main. It parses CLI
//! arguments, runs the shared data pipeline, then prints reports and plots or
//! writes exports.

use clap::Parser;
use serde::Serialize;

use crate::cli::{ChartKind, Command, DatasetsArgs, FetchArgs, ForecastArgs, PlotArgs, PrepareArgs, StatsArgs};
use crate::config::Settings;
use crate::datasets::{DatasetId, DatasetInfo};
use crate::error::AppError;
use crate::features::{parse_knot, DatetimeAttributeSeasonality, DeterministicProcess, DeterministicTerm, PiecewiseLinearTrend};
use crate::forecast::{bootstrap_intervals, regression_forecast, BootstrapOptions};
use crate::io::ForecastFile;
use crate::report::{self, SeriesSummary, Strengths};
use crate::stats::{adfuller_test, decompose_additive, kpss_test, AdfOptions, TestResult};

pub mod pipeline;

use pipeline::{maybe_tail, DataRequest};

/// Entry point for the `dives` binary.
pub fn run() -> Result<(), AppError> {
    // `dives` and `dives --steps 12` behave like `dives tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Datasets(args) => handle_datasets(&args),
        Command::Fetch(args) => handle_fetch(&args),
        Command::Prepare(args) => handle_prepare(&args),
        Command::Forecast(args) => handle_forecast(&args),
        Command::Stats(args) => handle_stats(&args),
        Command::Plot(args) => handle_plot(&args),
        Command::Tui(args) => crate::tui::run(args),
    }
}

#[derive(Serialize)]
struct DatasetEntry<'a> {
    id: &'static str,
    #[serde(flatten)]
    info: &'a DatasetInfo,
}

fn handle_datasets(args: &DatasetsArgs) -> Result<(), AppError> {
    let datasets: Vec<_> = DatasetId::ALL.iter().map(|id| (id.slug(), id.dataset())).collect();
    if args.json {
        let entries: Vec<DatasetEntry> = datasets
            .iter()
            .map(|(id, d)| DatasetEntry { id: *id, info: d.info() })
            .collect();
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| AppError::runtime(format!("Failed to serialize datasets: {e}")))?;
        println!("{json}");
        return Ok(());
    }
    for (id, d) in &datasets {
        println!("[{id}]");
        println!("{}", report::format_dataset_info(d.info()));
    }
    Ok(())
}

fn handle_fetch(args: &FetchArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let fetch = pipeline::http_fetcher(&settings)?;
    let request = DataRequest::from_source(&args.source);
    let raw = pipeline::load_raw(&settings, &request, &fetch)?;
    println!(
        "{}: {} rows x {} columns",
        request.dataset.dataset().info(),
        raw.len(),
        raw.headers.len()
    );
    if let Some(path) = &args.export {
        crate::io::write_raw_csv(path, &raw)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_prepare(args: &PrepareArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let fetch = pipeline::http_fetcher(&settings)?;
    let prepared = pipeline::prepare(&settings, &DataRequest::from_prep(&args.prep), &fetch)?;

    println!("{} ({} raw rows)\n", prepared.info, prepared.raw_rows);
    println!("{}", report::format_frame_preview(&prepared.frame, args.rows));
    for name in prepared.frame.float_column_names() {
        let series = prepared.frame.series(name)?;
        print!("{}", report::format_series_summary(&report::summarize(&series)));
    }
    if let Some(path) = &args.export {
        crate::io::write_frame_csv(path, &prepared.frame)?;
        println!("\nWrote {}", path.display());
    }
    Ok(())
}

fn handle_forecast(args: &ForecastArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let fetch = pipeline::http_fetcher(&settings)?;
    let prepared = pipeline::prepare(&settings, &DataRequest::from_prep(&args.prep), &fetch)?;
    let series = maybe_tail(prepared.series(args.column.as_deref())?, args.tail);
    println!("{}", report::format_series_summary(&report::summarize(&series)));

    let (export, plot) = if args.regression {
        let process = build_process(&series.index, !args.no_constant, &args.knots, &args.seasons)?;
        println!("Terms: {}", process.term_names().join(" + "));
        let fit = regression_forecast(&series, &process, args.steps)?;
        println!("{}", report::format_regression(&fit));
        let plot = crate::plot::render_forecast_plot(&series, Some(&fit.forecast), None, args.width, args.height);
        (ForecastFile::from_point("regression", &fit.forecast), plot)
    } else if args.replicates == 0 {
        let point = args.method.forecast(&series, args.steps, args.period)?;
        println!("{}", report::format_point_forecast(args.method.label(), &point));
        let plot = crate::plot::render_forecast_plot(&series, Some(&point), None, args.width, args.height);
        (ForecastFile::from_point(args.method.label(), &point), plot)
    } else {
        let options = BootstrapOptions {
            replicates: args.replicates,
            block_size: args.block_size,
            strategy: args.strategy,
            level: args.level,
            seed: args.seed,
            period: args.period,
        };
        let f = bootstrap_intervals(&series, args.method, args.steps, &options)?;
        println!("{}", report::format_interval_forecast(&f));
        let plot = crate::plot::render_forecast_plot(
            &series,
            Some(&f.point),
            Some((&f.lower, &f.upper)),
            args.width,
            args.height,
        );
        (ForecastFile::from_intervals(&f), plot)
    };

    if !args.no_plot {
        println!("{plot}");
    }
    if let Some(path) = &args.export {
        crate::io::write_forecast_csv(path, &export)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::write_forecast_json(path, &export)?;
    }
    Ok(())
}

/// Deterministic process from CLI knots and seasonal attributes.
pub fn build_process(
    index: &[chrono::NaiveDateTime],
    constant: bool,
    knots: &[String],
    seasons: &[crate::domain::DatetimeAttr],
) -> Result<DeterministicProcess, AppError> {
    let knots = knots.iter().map(|k| parse_knot(k)).collect::<Result<Vec<_>, _>>()?;
    let mut terms: Vec<Box<dyn DeterministicTerm>> = vec![Box::new(PiecewiseLinearTrend::new(knots))];
    for &attr in seasons {
        terms.push(Box::new(DatetimeAttributeSeasonality::new(attr)));
    }
    Ok(DeterministicProcess::new(index.to_vec(), constant, terms))
}

#[derive(Serialize)]
struct StatsReport {
    summary: SeriesSummary,
    strengths: Option<Strengths>,
    adf: TestResult,
    kpss: TestResult,
}

fn handle_stats(args: &StatsArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let fetch = pipeline::http_fetcher(&settings)?;
    let prepared = pipeline::prepare(&settings, &DataRequest::from_prep(&args.prep), &fetch)?;
    let series = maybe_tail(prepared.series(args.column.as_deref())?, args.tail);

    let strengths = match decompose_additive(&series, args.period) {
        Ok(d) => Some(report::strengths(&d)),
        Err(err) if err.exit_code() == 3 => {
            log::warn!("skipping decomposition: {err}");
            None
        }
        Err(err) => return Err(err),
    };
    let adf = adfuller_test(
        &series,
        &AdfOptions {
            regression: args.regression,
            maxlag: args.maxlag,
            autolag: args.autolag.to_autolag(),
        },
    )?;
    let kpss = kpss_test(&series, args.regression, args.kpss_lags)?;
    let stats = StatsReport {
        summary: report::summarize(&series),
        strengths,
        adf,
        kpss,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| AppError::runtime(format!("Failed to serialize stats: {e}")))?;
        println!("{json}");
        return Ok(());
    }
    println!("{}", report::format_series_summary(&stats.summary));
    if let Some(s) = &stats.strengths {
        println!("{}", report::format_strengths(s));
    }
    println!("{}", report::format_test_result(&stats.adf));
    println!("{}", report::format_test_result(&stats.kpss));
    Ok(())
}

fn handle_plot(args: &PlotArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let fetch = pipeline::http_fetcher(&settings)?;
    let prepared = pipeline::prepare(&settings, &DataRequest::from_prep(&args.prep), &fetch)?;
    let size = (args.width, args.height);

    let columns: Vec<Option<&str>> = if args.columns.is_empty() {
        vec![None]
    } else {
        args.columns.iter().map(|c| Some(c.as_str())).collect()
    };
    let series = columns
        .iter()
        .map(|c| prepared.series(*c).map(|s| maybe_tail(s, args.tail)))
        .collect::<Result<Vec<_>, _>>()?;
    let first = &series[0];

    let svg = match args.kind {
        ChartKind::Series => crate::plot::plot_time_series(&series, None, !args.overlay, size)?,
        ChartKind::Seasonal => crate::plot::plot_seasonal_periods(first, args.group_by, args.x_attr, size)?,
        ChartKind::Acf => crate::plot::plot_autocorrelations(first, args.lags, args.alpha, args.zero, size)?,
        ChartKind::Residuals => {
            let resid = first
                .with_values(args.method.residuals(first, args.period)?)?
                .renamed(format!("{} {} residuals", first.name, args.method.label()));
            crate::plot::plot_residuals_diagnostics(&resid, size)?
        }
    };
    crate::io::write_text(&args.out, &svg)?;
    println!("Wrote {}", args.out.display());
    Ok(())
}

/// Rewrite argv so `dives` defaults to `dives tui`.
///
/// - `dives`                        -> `dives tui`
/// - `dives --steps 12 ...`         -> `dives tui --steps 12 ...`
/// - `dives --help/--version/-h`    -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "datasets" | "fetch" | "prepare" | "forecast" | "stats" | "plot" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}
