//! Plotters-powered forecast chart widget for Ratatui.
//!
//! Plotters output is rendered into the Ratatui buffer using
//! `plotters-ratatui-backend`. The x axis is days since the Unix epoch so
//! hourly and monthly data share one code path.

use chrono::{DateTime, NaiveDateTime};
use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::domain::TimeSeries;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn day_number(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp() as f64 / SECONDS_PER_DAY
}

fn fmt_date(v: f64) -> String {
    DateTime::from_timestamp((v * SECONDS_PER_DAY).round() as i64, 0)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

/// Runs of consecutive finite points; a missing value starts a new run.
fn segments(series: &TimeSeries) -> Vec<Vec<(f64, f64)>> {
    let mut out: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current = Vec::new();
    for (t, y) in series.points() {
        if y.is_finite() {
            current.push((day_number(t), y));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Lines and bounds for one frame, computed outside the render call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub history: Vec<Vec<(f64, f64)>>,
    /// Starts at the last finite observation so the line joins the history.
    pub forecast: Vec<(f64, f64)>,
    pub lower: Vec<(f64, f64)>,
    pub upper: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl ChartData {
    pub fn build(history: &TimeSeries, forecast: &TimeSeries, band: Option<&(TimeSeries, TimeSeries)>) -> Self {
        let history_lines = segments(history);
        let anchor = history_lines.last().and_then(|s| s.last()).copied();

        let anchored = |ts: &TimeSeries| -> Vec<(f64, f64)> {
            anchor
                .into_iter()
                .chain(
                    ts.points()
                        .filter(|(_, y)| y.is_finite())
                        .map(|(t, y)| (day_number(t), y)),
                )
                .collect()
        };
        let forecast_line = anchored(forecast);
        let (lower, upper) = match band {
            Some((lo, hi)) => (anchored(lo), anchored(hi)),
            None => (Vec::new(), Vec::new()),
        };

        let all = history_lines
            .iter()
            .flatten()
            .chain(&forecast_line)
            .chain(&lower)
            .chain(&upper);
        let (mut x0, mut x1, mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in all {
            x0 = x0.min(x);
            x1 = x1.max(x);
            y0 = y0.min(y);
            y1 = y1.max(y);
        }

        if !x0.is_finite() || x1 <= x0 {
            x0 = 0.0;
            x1 = 1.0;
        }
        if !y0.is_finite() || !y1.is_finite() || y1 <= y0 {
            let mid = if y0.is_finite() { y0 } else { 0.0 };
            y0 = mid - 0.5;
            y1 = mid + 0.5;
        }
        let pad = ((y1 - y0) * 0.05).max(1e-12);

        Self {
            history: history_lines,
            forecast: forecast_line,
            lower,
            upper,
            x_bounds: [x0, x1],
            y_bounds: [y0 - pad, y1 + pad],
        }
    }
}

pub struct ForecastChart<'a> {
    pub data: &'a ChartData,
    pub y_label: String,
}

impl<'a> Widget for ForecastChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.data.x_bounds;
        let [y0, y1] = self.data.y_bounds;
        let data = self.data;

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .y_desc(&self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| fmt_date(*v))
                .y_label_formatter(&|v| format!("{v:.1}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let history_color = WHITE;
            let forecast_color = RGBColor(0, 255, 255); // cyan
            let band_color = RGBColor(255, 255, 0); // yellow

            for run in &data.history {
                chart.draw_series(LineSeries::new(run.iter().copied(), &history_color))?;
            }
            // Band first so the point forecast stays on top.
            chart.draw_series(LineSeries::new(data.lower.iter().copied(), &band_color))?;
            chart.draw_series(LineSeries::new(data.upper.iter().copied(), &band_color))?;
            chart.draw_series(LineSeries::new(data.forecast.iter().copied(), &forecast_color))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn daily(name: &str, start_day: u32, values: Vec<f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, start_day).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let index = (0..values.len() as i64).map(|d| start + chrono::Duration::days(d)).collect();
        TimeSeries::new(name, index, values).unwrap()
    }

    #[test]
    fn gaps_split_history_and_forecast_is_anchored() {
        let history = daily("h", 1, vec![1.0, 2.0, f64::NAN, 4.0, 5.0]);
        let forecast = daily("f", 6, vec![5.0, 5.0]);
        let lower = daily("lo", 6, vec![3.0, 2.0]);
        let upper = daily("hi", 6, vec![7.0, 8.0]);

        let data = ChartData::build(&history, &forecast, Some(&(lower, upper)));
        assert_eq!(data.history.len(), 2);
        assert_eq!(data.history[1].len(), 2);
        assert_eq!(data.forecast.len(), 3);
        assert_eq!(data.forecast[0], *data.history[1].last().unwrap());
        assert_eq!(data.lower[0].1, 5.0);
        assert!(data.y_bounds[0] < 1.0 && data.y_bounds[1] > 8.0);
        assert_eq!(fmt_date(data.x_bounds[0]), "2020-01");
    }

    #[test]
    fn flat_series_gets_nonempty_bounds() {
        let history = daily("h", 1, vec![3.0; 4]);
        let forecast = daily("f", 5, vec![3.0]);
        let data = ChartData::build(&history, &forecast, None);
        assert!(data.lower.is_empty());
        assert!(data.y_bounds[1] > data.y_bounds[0]);
        assert!(data.x_bounds[1] > data.x_bounds[0]);
    }

    #[test]
    fn tiny_area_shows_a_hint() {
        let history = daily("h", 1, (0..30).map(|i| i as f64).collect());
        let forecast = daily("f", 31, vec![30.0, 31.0]);
        let data = ChartData::build(&history, &forecast, None);
        let tiny = Rect::new(0, 0, 10, 4);
        let mut small = Buffer::empty(tiny);
        ForecastChart {
            data: &data,
            y_label: "h".into(),
        }
        .render(tiny, &mut small);
        assert!(small.content().iter().any(|c| c.symbol() == "C"));
    }
}
