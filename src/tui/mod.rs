//! Ratatui-based terminal UI.
//!
//! One screen: the recent history of a dataset column with a benchmark
//! forecast and its bootstrap band, plus a stationarity panel. Keys cycle the
//! dataset, the column and the method, and change the horizon.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use log::LevelFilter;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};

use crate::app::pipeline::{self, DataRequest, Prepared};
use crate::cli::TuiArgs;
use crate::config::Settings;
use crate::datasets::{DatasetId, Fetch};
use crate::domain::{Regression, TimeSeries};
use crate::error::AppError;
use crate::forecast::{bootstrap_intervals, BootstrapOptions, ForecastMethod};
use crate::report::{summarize, SeriesSummary};
use crate::stats::{adfuller_test, kpss_test, AdfOptions, KpssLags, TestResult};

mod plotters_chart;

use plotters_chart::{ChartData, ForecastChart};

/// Observations the forecast and the tests are computed on.
const WINDOW: usize = 360;
const MAX_STEPS: usize = 240;
const STEP_DELTA: usize = 6;

/// Start the TUI.
pub fn run(args: TuiArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let fetch = pipeline::http_fetcher(&settings)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(args, settings, Box::new(fetch));
    app.event_loop(&mut terminal)
}

/// Turns logging off while held; the previous level comes back on drop.
struct QuietLogs {
    previous: LevelFilter,
}

impl QuietLogs {
    fn new() -> Self {
        let previous = log::max_level();
        log::set_max_level(LevelFilter::Off);
        Self { previous }
    }
}

impl Drop for QuietLogs {
    fn drop(&mut self) {
        log::set_max_level(self.previous);
    }
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
///
/// Log output would land inside the frame, so logging stays off until the
/// terminal is restored.
struct TerminalGuard {
    _quiet: QuietLogs,
}

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        let quiet = QuietLogs::new();
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self { _quiet: quiet })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Everything drawn for the selected dataset, column and method.
struct View {
    history: TimeSeries,
    forecast: TimeSeries,
    band: Option<(TimeSeries, TimeSeries)>,
    summary: SeriesSummary,
    adf: Result<TestResult, String>,
    kpss: Result<TestResult, String>,
}

struct App {
    settings: Settings,
    fetch: Box<dyn Fetch>,
    data_dir: Option<PathBuf>,
    dataset: DatasetId,
    column: Option<String>,
    method: ForecastMethod,
    steps: usize,
    show_band: bool,
    bootstrap: BootstrapOptions,
    prepared: Option<Prepared>,
    view: Option<View>,
    pending_reload: bool,
    status: String,
}

impl App {
    fn new(args: TuiArgs, settings: Settings, fetch: Box<dyn Fetch>) -> Self {
        Self {
            settings,
            fetch,
            data_dir: args.data_dir,
            dataset: args.dataset,
            column: None,
            method: ForecastMethod::SeasonalNaive,
            steps: args.steps.clamp(1, MAX_STEPS),
            show_band: true,
            bootstrap: BootstrapOptions {
                replicates: args.replicates.max(1),
                period: args.period,
                seed: args.seed,
                ..BootstrapOptions::default()
            },
            prepared: None,
            view: None,
            pending_reload: true,
            status: format!("Loading {}...", args.dataset.slug()),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            // Draw the "Loading" status first, then block on the fetch.
            if self.pending_reload {
                self.reload();
                needs_redraw = true;
                continue;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('d') => {
                self.dataset = self.dataset.next();
                self.column = None;
                self.pending_reload = true;
                self.status = format!("Loading {}...", self.dataset.slug());
            }
            KeyCode::Char('c') => {
                self.column = self.next_column();
                self.recompute();
            }
            KeyCode::Char('m') => {
                self.method = self.method.next();
                self.recompute();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.steps = (self.steps + STEP_DELTA).min(MAX_STEPS);
                self.recompute();
            }
            KeyCode::Char('-') => {
                self.steps = self.steps.saturating_sub(STEP_DELTA).max(1);
                self.recompute();
            }
            KeyCode::Char('b') => {
                self.show_band = !self.show_band;
                self.recompute();
            }
            _ => {}
        }
        false
    }

    fn reload(&mut self) {
        self.pending_reload = false;
        let request = DataRequest {
            data_dir: self.data_dir.clone(),
            ..DataRequest::new(self.dataset)
        };
        match pipeline::prepare(&self.settings, &request, self.fetch.as_ref()) {
            Ok(prepared) => {
                self.column = Some(prepared.key_column.to_string());
                self.prepared = Some(prepared);
                self.recompute();
            }
            Err(err) => {
                self.prepared = None;
                self.view = None;
                self.status = format!("{}: {err}", self.dataset.slug());
            }
        }
    }

    fn next_column(&self) -> Option<String> {
        let prepared = self.prepared.as_ref()?;
        let names = prepared.frame.float_column_names();
        let current = self.column.as_deref().and_then(|c| names.iter().position(|n| *n == c));
        let next = current.map_or(0, |i| (i + 1) % names.len().max(1));
        names.get(next).map(|n| n.to_string())
    }

    fn recompute(&mut self) {
        let Some(prepared) = &self.prepared else {
            return;
        };
        let analysis = prepared
            .series(self.column.as_deref())
            .and_then(|series| analyze(&series, self.method, self.steps, self.show_band, &self.bootstrap));
        match analysis {
            Ok((view, note)) => {
                self.status = note.unwrap_or_else(|| {
                    format!(
                        "{} | {} | {} steps",
                        self.dataset.slug(),
                        self.method.label(),
                        self.steps
                    )
                });
                self.view = Some(view);
            }
            Err(err) => {
                self.view = None;
                self.status = err.to_string();
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let name = self
            .prepared
            .as_ref()
            .map(|p| p.info.name)
            .unwrap_or_else(|| self.dataset.slug());
        let column = self.column.as_deref().unwrap_or("-");
        let freq = self
            .view
            .as_ref()
            .and_then(|v| v.history.frequency().ok())
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string());

        let lines = vec![
            Line::from(vec![
                Span::styled("dives", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" {name}")),
            ]),
            Line::from(Span::styled(
                format!(
                    "column: {column} | freq: {freq} | method: {} | steps: {} | band: {}",
                    self.method.label(),
                    self.steps,
                    if self.show_band {
                        format!("{:.0}% x{}", self.bootstrap.level * 100.0, self.bootstrap.replicates)
                    } else {
                        "off".to_string()
                    },
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::LEFT | Borders::RIGHT | Borders::TOP));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(7)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_stationarity(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = self.column.as_deref().unwrap_or("Forecast");
        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(view) = &self.view else {
            let msg = Paragraph::new("Waiting for data...")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let data = ChartData::build(&view.history, &view.forecast, view.band.as_ref());
        frame.render_widget(
            ForecastChart {
                data: &data,
                y_label: view.history.name.clone(),
            },
            inner,
        );
    }

    fn draw_stationarity(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Stationarity").borders(Borders::ALL);
        let Some(view) = &self.view else {
            frame.render_widget(block, area);
            return;
        };

        let s = &view.summary;
        let mut lines = vec![Line::from(Span::styled(
            format!(
                "last {} obs ({} missing) | mean={:.3} std={:.3} min={:.3} max={:.3}",
                s.n, s.missing, s.mean, s.std, s.min, s.max
            ),
            Style::default().fg(Color::Gray),
        ))];
        lines.push(test_line(&view.adf));
        lines.push(test_line(&view.kpss));
        lines.push(Line::from(Span::styled(
            "ADF rejects a unit root; KPSS rejects stationarity.",
            Style::default().fg(Color::DarkGray),
        )));

        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "d dataset  c column  m method  +/- steps  b band  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn test_line(result: &Result<TestResult, String>) -> Line<'static> {
    match result {
        Ok(r) => {
            let verdict = if r.stationary { "stationary" } else { "non-stationary" };
            let color = if r.stationary { Color::Green } else { Color::Red };
            Line::from(vec![
                Span::styled(format!("{:<5}", r.test), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    " stat={:>8.4}  p={:.4}  lags={:<3} ",
                    r.statistic, r.p_value, r.lags
                )),
                Span::styled(verdict, Style::default().fg(color)),
            ])
        }
        Err(msg) => Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Yellow))),
    }
}

/// Forecast and tests on the trailing window of `series`.
///
/// A failing bootstrap does not fail the view: the point forecast is kept
/// and the reason comes back as a status note.
fn analyze(
    series: &TimeSeries,
    method: ForecastMethod,
    steps: usize,
    with_band: bool,
    bootstrap: &BootstrapOptions,
) -> Result<(View, Option<String>), AppError> {
    let history = series.tail(WINDOW);
    let forecast = method.forecast(&history, steps, bootstrap.period)?;

    let mut note = None;
    let band = if with_band {
        match bootstrap_intervals(&history, method, steps, bootstrap) {
            Ok(f) => Some((f.lower, f.upper)),
            Err(err) => {
                note = Some(format!("no band: {err}"));
                None
            }
        }
    } else {
        None
    };

    let adf = adfuller_test(&history, &AdfOptions::default()).map_err(|e| format!("ADF: {e}"));
    let kpss = kpss_test(&history, Regression::C, KpssLags::Auto).map_err(|e| format!("KPSS: {e}"));

    let view = View {
        summary: summarize(&history),
        history,
        forecast,
        band,
        adf,
        kpss,
    };
    Ok((view, note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::cache::tests::CannedFetch;
    use chrono::{Months, NaiveDate};

    fn app(dir: &std::path::Path) -> App {
        let args = TuiArgs {
            dataset: DatasetId::Synthetic,
            data_dir: Some(dir.to_path_buf()),
            steps: 12,
            period: 12,
            replicates: 20,
            seed: 7,
        };
        App::new(args, Settings::default(), Box::new(CannedFetch::new("")))
    }

    #[test]
    fn logging_is_off_while_the_screen_is_owned() {
        log::set_max_level(LevelFilter::Warn);
        {
            let _quiet = QuietLogs::new();
            assert_eq!(log::max_level(), LevelFilter::Off);
        }
        assert_eq!(log::max_level(), LevelFilter::Warn);
    }

    #[test]
    fn keys_cycle_method_steps_and_band() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.reload();
        assert!(app.view.is_some(), "{}", app.status);
        assert_eq!(app.column.as_deref(), Some("value"));

        assert!(!app.handle_key(KeyCode::Char('m')));
        assert_eq!(app.method, ForecastMethod::SeasonalNaive.next());

        app.handle_key(KeyCode::Char('+'));
        assert_eq!(app.steps, 12 + STEP_DELTA);
        assert_eq!(app.view.as_ref().unwrap().forecast.len(), 12 + STEP_DELTA);
        for _ in 0..10 {
            app.handle_key(KeyCode::Char('-'));
        }
        assert_eq!(app.steps, 1);

        assert!(app.view.as_ref().unwrap().band.is_some());
        app.handle_key(KeyCode::Char('b'));
        assert!(app.view.as_ref().unwrap().band.is_none());

        app.handle_key(KeyCode::Char('c'));
        assert_eq!(app.column.as_deref(), Some("value"));

        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn dataset_key_defers_the_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.reload();
        app.handle_key(KeyCode::Char('d'));
        assert_eq!(app.dataset, DatasetId::MloCo2);
        assert!(app.pending_reload);
        assert!(app.status.starts_with("Loading"));

        // The canned body has no CO2 columns, so the load fails into the status line.
        app.reload();
        assert!(app.view.is_none());
        assert!(app.status.starts_with("mlo-co2:"));
    }

    #[test]
    fn analyze_keeps_point_forecast_when_band_fails() {
        let start = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let index = (0..48u32).map(|i| start + Months::new(i)).collect();
        let mut values: Vec<f64> = (0..48).map(|i| (i as f64 * 0.5).sin() + i as f64 * 0.1).collect();
        values[10] = f64::NAN;
        let series = TimeSeries::new("x", index, values).unwrap();

        let options = BootstrapOptions {
            replicates: 10,
            ..BootstrapOptions::default()
        };
        let (view, note) = analyze(&series, ForecastMethod::Drift, 6, true, &options).unwrap();
        assert_eq!(view.forecast.len(), 6);
        assert!(view.band.is_none());
        assert!(note.unwrap().starts_with("no band"));
        assert_eq!(view.summary.missing, 1);
    }
}
