//! SVG charts rendered with Plotters.
//!
//! Every function returns the SVG document as a string; callers decide where
//! it goes. The x axis of time charts is days since the Unix epoch, labelled
//! as dates.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, NaiveDateTime};
use plotters::coord::Shift;
use plotters::prelude::*;
use statrs::distribution::{Continuous, Normal};

use crate::domain::{DatetimeAttr, TimeSeries};
use crate::error::AppError;
use crate::stats::{acf, acf_band, default_nlags, pacf, pacf_band, std as sample_std};

pub const DEFAULT_SIZE: (u32, u32) = (1024, 640);

const SECONDS_PER_DAY: f64 = 86_400.0;
const HIST_BINS: usize = 20;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn draw_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::runtime(format!("Chart rendering failed: {e}"))
}

fn day_number(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp() as f64 / SECONDS_PER_DAY
}

fn date_label(v: f64) -> String {
    DateTime::from_timestamp((v * SECONDS_PER_DAY).round() as i64, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn finite_points(series: &TimeSeries) -> Vec<(f64, f64)> {
    series
        .points()
        .filter(|(_, y)| y.is_finite())
        .map(|(t, y)| (day_number(t), y))
        .collect()
}

/// Min..max of the values, padded by 5% (or by 0.5 when flat).
fn padded(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return None;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    Some(lo - pad..hi + pad)
}

fn color(i: usize) -> RGBAColor {
    Palette99::pick(i).to_rgba()
}

/// One panel of line series sharing an x range.
fn draw_lines(
    area: &Area<'_>,
    lines: &[(String, Vec<(f64, f64)>)],
    x_range: Range<f64>,
    y_desc: &str,
    legend: bool,
) -> Result<(), AppError> {
    let y_range = padded(lines.iter().flat_map(|(_, pts)| pts.iter().map(|&(_, y)| y))).unwrap_or(0.0..1.0);
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_labels(6)
        .x_label_formatter(&|v| date_label(*v))
        .y_desc(y_desc)
        .draw()
        .map_err(draw_err)?;

    for (i, (name, points)) in lines.iter().enumerate() {
        let c = color(i);
        let series = chart
            .draw_series(LineSeries::new(points.iter().copied(), &c))
            .map_err(draw_err)?;
        if legend {
            series
                .label(name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &c));
        }
    }
    if legend {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;
    }
    Ok(())
}

/// Time plots for one or more series, stacked in panels or overlaid with a legend.
///
/// `labels` name each series (y-axis title in panels, legend entry when
/// overlaid) and default to the series names.
pub fn plot_time_series(
    series: &[TimeSeries],
    labels: Option<&[String]>,
    subplots: bool,
    size: (u32, u32),
) -> Result<String, AppError> {
    if series.is_empty() {
        return Err(AppError::usage("Nothing to plot: no series given."));
    }
    let names: Vec<String> = match labels {
        Some(l) if l.len() != series.len() => {
            return Err(AppError::usage(format!(
                "Got {} labels for {} series.",
                l.len(),
                series.len()
            )));
        }
        Some(l) => l.to_vec(),
        None => series.iter().map(|s| s.name.clone()).collect(),
    };
    let lines: Vec<(String, Vec<(f64, f64)>)> = names
        .into_iter()
        .zip(series)
        .map(|(name, s)| (name, finite_points(s)))
        .collect();
    let x_range = padded_time(&lines)?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        if subplots {
            let panels = root.split_evenly((lines.len(), 1));
            for (panel, line) in panels.iter().zip(&lines) {
                draw_lines(panel, std::slice::from_ref(line), x_range.clone(), &line.0, false)?;
            }
        } else {
            draw_lines(&root, &lines, x_range, "", true)?;
        }
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

fn padded_time(lines: &[(String, Vec<(f64, f64)>)]) -> Result<Range<f64>, AppError> {
    let xs = lines.iter().flat_map(|(_, pts)| pts.iter().map(|&(x, _)| x));
    let (lo, hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if !lo.is_finite() {
        return Err(AppError::data("Nothing to plot: every value is missing."));
    }
    Ok(if hi > lo { lo..hi } else { lo - 1.0..hi + 1.0 })
}

/// Overlay each seasonal period: observations are grouped by `group_by`
/// (e.g. year) and each group is drawn against `x_attr` (e.g. month), colored
/// along a gradient from the earliest group to the latest.
pub fn plot_seasonal_periods(
    series: &TimeSeries,
    group_by: DatetimeAttr,
    x_attr: DatetimeAttr,
    size: (u32, u32),
) -> Result<String, AppError> {
    let mut groups: BTreeMap<i64, Vec<(f64, f64)>> = BTreeMap::new();
    for (t, y) in series.points().filter(|(_, y)| y.is_finite()) {
        groups.entry(group_by.of(t)).or_default().push((x_attr.of(t) as f64, y));
    }
    if groups.is_empty() {
        return Err(AppError::data(format!("Series '{}' has no values to plot.", series.name)));
    }

    let x_range = padded(groups.values().flatten().map(|&(x, _)| x)).unwrap_or(0.0..1.0);
    let y_range = padded(groups.values().flatten().map(|&(_, y)| y)).unwrap_or(0.0..1.0);
    let ngroups = groups.len();
    let (first, last) = (
        groups.keys().next().copied().unwrap_or_default(),
        groups.keys().next_back().copied().unwrap_or_default(),
    );

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} by {} ({first}..{last})", series.name, group_by.name()),
                ("sans-serif", 20),
            )
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_desc(x_attr.name())
            .y_desc(series.name.as_str())
            .draw()
            .map_err(draw_err)?;

        for (i, points) in groups.values().enumerate() {
            let shade = HSLColor(0.75 * i as f64 / ngroups.max(2).saturating_sub(1) as f64, 0.8, 0.45);
            chart
                .draw_series(LineSeries::new(points.iter().copied(), &shade))
                .map_err(draw_err)?;
        }
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

/// Stems for lags with a shaded `±band` region around zero.
fn draw_correlogram(
    area: &Area<'_>,
    values: &[f64],
    band: &[f64],
    first_lag: usize,
    y_desc: &str,
    x_desc: &str,
) -> Result<(), AppError> {
    let nlags = values.len().saturating_sub(1);
    let lo = values
        .iter()
        .copied()
        .chain(band.iter().map(|w| -w))
        .fold(-0.1f64, f64::min);
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(first_lag as f64 - 0.5..nlags as f64 + 0.5, (lo - 0.05).max(-1.05)..1.05)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc(y_desc)
        .x_desc(x_desc)
        .draw()
        .map_err(draw_err)?;

    let lags: Vec<usize> = (first_lag..=nlags).collect();
    let mut outline: Vec<(f64, f64)> = lags.iter().map(|&k| (k as f64, band[k])).collect();
    outline.extend(lags.iter().rev().map(|&k| (k as f64, -band[k])));
    chart
        .draw_series(std::iter::once(Polygon::new(outline, &BLUE.mix(0.15))))
        .map_err(draw_err)?;
    chart
        .draw_series(
            lags.iter()
                .map(|&k| PathElement::new(vec![(k as f64, 0.0), (k as f64, values[k])], &BLACK)),
        )
        .map_err(draw_err)?;
    chart
        .draw_series(lags.iter().map(|&k| Circle::new((k as f64, values[k]), 3, BLUE.filled())))
        .map_err(draw_err)?;
    Ok(())
}

/// ACF (top) and PACF (bottom) with confidence bands on a shared lag axis.
///
/// `lags` defaults to `min(10·log10(n), n − 1)`; lag 0 is drawn only when `zero` is set.
pub fn plot_autocorrelations(
    series: &TimeSeries,
    lags: Option<usize>,
    alpha: f64,
    zero: bool,
    size: (u32, u32),
) -> Result<String, AppError> {
    let values = series.finite_values();
    let nlags = lags.unwrap_or_else(|| default_nlags(values.len()));
    // PACF needs fewer lags than half the sample.
    let nlags = nlags.min(values.len() / 2).max(1);
    let r = acf(&values, nlags)?;
    let p = pacf(&values, nlags)?;
    let r_band = acf_band(&r, values.len(), alpha)?;
    let p_band = pacf_band(nlags, values.len(), alpha)?;
    let first_lag = usize::from(!zero);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        let panels = root.split_evenly((2, 1));
        draw_correlogram(&panels[0], &r, &r_band, first_lag, "acf", "")?;
        draw_correlogram(&panels[1], &p, &p_band, first_lag, "pacf", "lag")?;
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

/// Residual time plot on top; ACF bottom-left; histogram density against
/// `N(0, σ)` bottom-right.
pub fn plot_residuals_diagnostics(residuals: &TimeSeries, size: (u32, u32)) -> Result<String, AppError> {
    let values = residuals.finite_values();
    if values.len() < 3 {
        return Err(AppError::data(format!(
            "Residual diagnostics need at least 3 values (got {}).",
            values.len()
        )));
    }
    let sigma = sample_std(&values);
    let nlags = default_nlags(values.len()).min(values.len() / 2).max(1);
    let r = acf(&values, nlags)?;
    let band = acf_band(&r, values.len(), 0.05)?;

    let line = vec![("residuals".to_string(), finite_points(residuals))];
    let x_range = padded_time(&line)?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        let (top, bottom) = root.split_vertically((size.1 / 2) as i32);
        let (left, right) = bottom.split_horizontally((size.0 / 2) as i32);

        draw_lines(&top, &line, x_range, "residuals", false)?;
        draw_correlogram(&left, &r, &band, 1, "acf", "lag")?;
        draw_histogram(&right, &values, sigma)?;
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

/// Histogram with density heights, plus a `N(0, sigma)` curve when sigma > 0.
fn draw_histogram(area: &Area<'_>, values: &[f64], sigma: f64) -> Result<(), AppError> {
    let range = padded(values.iter().copied()).unwrap_or(-1.0..1.0);
    let width = (range.end - range.start) / HIST_BINS as f64;
    let mut counts = [0usize; HIST_BINS];
    for &v in values {
        let bin = (((v - range.start) / width) as usize).min(HIST_BINS - 1);
        counts[bin] += 1;
    }
    let total = values.len() as f64;
    let densities: Vec<f64> = counts.iter().map(|&c| c as f64 / (total * width)).collect();

    let normal = if sigma.is_finite() && sigma > 0.0 {
        Some(Normal::new(0.0, sigma).map_err(|e| AppError::runtime(format!("Invalid normal overlay: {e}")))?)
    } else {
        None
    };
    let curve: Vec<(f64, f64)> = normal
        .map(|n| {
            (0..100)
                .map(|i| {
                    let x = -3.0 * sigma + 6.0 * sigma * i as f64 / 99.0;
                    (x, n.pdf(x))
                })
                .collect()
        })
        .unwrap_or_default();

    let x_lo = range.start.min(curve.first().map_or(range.start, |p| p.0));
    let x_hi = range.end.max(curve.last().map_or(range.end, |p| p.0));
    let y_hi = densities
        .iter()
        .chain(curve.iter().map(|p| &p.1))
        .fold(0.0f64, |a, &b| a.max(b))
        * 1.1;

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi.max(1e-9))
        .map_err(draw_err)?;
    chart.configure_mesh().disable_x_mesh().y_desc("density").draw().map_err(draw_err)?;

    let bars = chart
        .draw_series(densities.iter().enumerate().map(|(i, &d)| {
            let x0 = range.start + i as f64 * width;
            Rectangle::new([(x0, 0.0), (x0 + width, d)], BLUE.mix(0.4).filled())
        }))
        .map_err(draw_err)?;
    bars.label("residuals")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.4).filled()));

    if !curve.is_empty() {
        chart
            .draw_series(LineSeries::new(curve, &RED))
            .map_err(draw_err)?
            .label("N(0, σ)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(draw_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly(n: usize, f: impl Fn(usize) -> f64) -> TimeSeries {
        let index = (0..n)
            .map(|i| {
                NaiveDate::from_ymd_opt(2000 + (i / 12) as i32, (i % 12) as u32 + 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            })
            .collect();
        TimeSeries::new("co2", index, (0..n).map(f).collect()).unwrap()
    }

    fn wave(i: usize) -> f64 {
        (i as f64 * std::f64::consts::PI / 6.0).sin() + i as f64 * 0.01
    }

    #[test]
    fn time_series_panels_and_overlay() {
        let a = monthly(36, wave);
        let b = monthly(36, |i| i as f64).renamed("count");
        let stacked = plot_time_series(&[a.clone(), b.clone()], None, true, DEFAULT_SIZE).unwrap();
        assert!(stacked.starts_with("<svg"));
        assert!(stacked.contains("count"));

        let labels = vec!["first".to_string(), "second".to_string()];
        let overlay = plot_time_series(&[a.clone(), b], Some(&labels), false, DEFAULT_SIZE).unwrap();
        assert!(overlay.contains("second"));

        let err = plot_time_series(&[a], Some(&labels), false, DEFAULT_SIZE).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn date_labels_round_trip_days() {
        let t = NaiveDate::from_ymd_opt(2012, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(date_label(day_number(t)), "2012-03-04");
    }

    #[test]
    fn seasonal_periods_draw_one_line_per_group() {
        let s = monthly(36, wave);
        let svg = plot_seasonal_periods(&s, DatetimeAttr::Year, DatetimeAttr::Month, DEFAULT_SIZE).unwrap();
        assert!(svg.matches("<polyline").count() >= 3);
        assert!(svg.contains("2000..2002"));

        let empty = monthly(3, |_| f64::NAN);
        assert!(plot_seasonal_periods(&empty, DatetimeAttr::Year, DatetimeAttr::Month, DEFAULT_SIZE).is_err());
    }

    #[test]
    fn correlograms_and_diagnostics_render() {
        let s = monthly(60, wave);
        let svg = plot_autocorrelations(&s, Some(12), 0.05, false, DEFAULT_SIZE).unwrap();
        assert!(svg.contains("pacf"));
        let resid = monthly(60, |i| wave(i) - wave(i.saturating_sub(1)));
        let svg = plot_residuals_diagnostics(&resid, DEFAULT_SIZE).unwrap();
        assert!(svg.contains("density"));
        assert!(plot_residuals_diagnostics(&monthly(2, wave), DEFAULT_SIZE).is_err());
    }
}
