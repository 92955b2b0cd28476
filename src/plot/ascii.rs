//! ASCII plotting for terminal output.
//!
//! Fixed-size grid, deterministic output (used by golden tests).
//!
//! Plot elements:
//! - history: `*` line
//! - forecast: `-` line, continuing from the last observation
//! - interval band: `:` lines for the lower and upper bounds
//!
//! Earlier elements win where lines cross.

use chrono::NaiveDateTime;

use crate::domain::TimeSeries;

/// Plot a series on its own.
pub fn render_series_plot(history: &TimeSeries, width: usize, height: usize) -> String {
    render_forecast_plot(history, None, None, width, height)
}

/// Plot history with an optional forecast and `(lower, upper)` band.
pub fn render_forecast_plot(
    history: &TimeSeries,
    forecast: Option<&TimeSeries>,
    band: Option<(&TimeSeries, &TimeSeries)>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let mut layers: Vec<(Vec<(NaiveDateTime, f64)>, char)> = vec![(history.points().collect(), '*')];
    let anchor = history.points().last();
    if let Some(f) = forecast {
        layers.push((anchor.into_iter().chain(f.points()).collect(), '-'));
    }
    if let Some((lower, upper)) = band {
        layers.push((anchor.into_iter().chain(lower.points()).collect(), ':'));
        layers.push((anchor.into_iter().chain(upper.points()).collect(), ':'));
    }

    let Some((t_min, t_max)) = time_range(&layers) else {
        return format!("Plot: '{}' has no data\n", history.name);
    };
    let (y_min, y_max) = y_range(&layers).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let span = seconds(t_min, t_max).max(1.0);
    for (points, ch) in &layers {
        let mapped: Vec<Option<(usize, usize)>> = points
            .iter()
            .map(|&(t, y)| {
                y.is_finite()
                    .then(|| (map_x(seconds(t_min, t), span, width), map_y(y, y_min, y_max, height)))
            })
            .collect();
        draw_polyline(&mut grid, &mapped, *ch);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} .. {} | y=[{y_min:.2}, {y_max:.2}]\n",
        t_min.format("%Y-%m-%d %H:%M"),
        t_max.format("%Y-%m-%d %H:%M")
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn seconds(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64
}

fn time_range(layers: &[(Vec<(NaiveDateTime, f64)>, char)]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let times = layers.iter().flat_map(|(points, _)| points.iter().map(|&(t, _)| t));
    let min = times.clone().min()?;
    let max = times.max()?;
    Some((min, max))
}

fn y_range(layers: &[(Vec<(NaiveDateTime, f64)>, char)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in layers.iter().flat_map(|(points, _)| points.iter()) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(offset: f64, span: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = (offset / span).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Connect consecutive mapped points; a missing point breaks the line.
fn draw_polyline(grid: &mut [Vec<char>], points: &[Option<(usize, usize)>], ch: char) {
    let mut prev: Option<(usize, usize)> = None;
    for p in points {
        match (prev, *p) {
            (Some((x0, y0)), Some((x1, y1))) => draw_line(grid, x0, y0, x1, y1, ch),
            (None, Some((x, y))) => {
                if grid[y][x] == ' ' {
                    grid[y][x] = ch;
                }
            }
            _ => {}
        }
        prev = *p;
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
