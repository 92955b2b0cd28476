//! Formatted terminal output.
//!
//! Formatting lives here so the numeric code stays free of presentation and
//! output changes stay local to one file.

use crate::datasets::DatasetInfo;
use crate::domain::{Frame, TimeSeries};
use crate::forecast::{IntervalForecast, RegressionForecast};
use crate::report::{SeriesSummary, Strengths};
use crate::stats::TestResult;

const TIME_FMT: &str = "%Y-%m-%d %H:%M";

pub fn format_dataset_info(info: &DatasetInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", info.name));
    out.push_str(&format!("Site: {}\n", info.site_url));
    if let Some(url) = info.download_url {
        out.push_str(&format!("Download: {url}\n"));
    } else {
        out.push_str("Download: (generated locally)\n");
    }
    out.push('\n');
    out.push_str(info.description.trim());
    out.push_str("\n\nCitation:\n");
    out.push_str(info.citation.trim());
    out.push('\n');
    out
}

pub fn format_series_summary(s: &SeriesSummary) -> String {
    let span = match (s.start, s.end) {
        (Some(a), Some(b)) => format!("{} .. {}", a.format(TIME_FMT), b.format(TIME_FMT)),
        _ => "(empty)".to_string(),
    };
    format!(
        "Series '{}': n={} missing={} | {span} | freq={}\n  mean={:.4} std={:.4} min={:.4} max={:.4}\n",
        s.name,
        s.n,
        s.missing,
        s.freq.as_deref().unwrap_or("irregular"),
        s.mean,
        s.std,
        s.min,
        s.max
    )
}

/// First `rows` rows of a frame as an aligned table.
pub fn format_frame_preview(frame: &Frame, rows: usize) -> String {
    let head = frame.head(rows);
    let names = head.column_names();
    let widths: Vec<usize> = names.iter().map(|n| n.chars().count().clamp(8, 14)).collect();

    let mut out = String::new();
    let mut header = format!("{:<16}", head.index_name);
    for (name, w) in names.iter().zip(&widths) {
        header.push_str(&format!(" {:>w$}", truncate(name, *w)));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for (row, t) in head.index.iter().enumerate() {
        let mut line = format!("{:<16}", t.format(TIME_FMT));
        for ((_, column), w) in head.columns.iter().zip(&widths) {
            let cell = if column.is_missing(row) {
                "NaN".to_string()
            } else {
                column.cell(row)
            };
            let cell = cell
                .parse::<f64>()
                .map(|v| format!("{v:.3}"))
                .unwrap_or(cell);
            line.push_str(&format!(" {:>w$}", truncate(&cell, *w)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.push_str(&format!("[{} rows x {} columns]\n", frame.len(), names.len()));
    out
}

/// A point forecast without intervals.
pub fn format_point_forecast(label: &str, forecast: &TimeSeries) -> String {
    let mut out = format!("Forecast ({label}) for '{}':\n", forecast.name);
    out.push_str(&format!("{:<16} {:>12}\n", "timestamp", "forecast"));
    for (t, v) in forecast.points() {
        out.push_str(&format!("{:<16} {v:>12.4}\n", t.format(TIME_FMT)));
    }
    out
}

pub fn format_interval_forecast(f: &IntervalForecast) -> String {
    let pct = f.level * 100.0;
    let mut out = format!(
        "Forecast ({}) for '{}' with {pct:.0}% bootstrap interval ({} replicates):\n",
        f.method.label(),
        f.point.name,
        f.replicates
    );
    out.push_str(&format!(
        "{:<16} {:>12} {:>12} {:>12}\n",
        "timestamp", "forecast", "lower", "upper"
    ));
    for (k, (t, v)) in f.point.points().enumerate() {
        out.push_str(&format!(
            "{:<16} {v:>12.4} {:>12.4} {:>12.4}\n",
            t.format(TIME_FMT),
            f.lower.values[k],
            f.upper.values[k]
        ));
    }
    out
}

pub fn format_regression(r: &RegressionForecast) -> String {
    let mut out = format!(
        "Regression on deterministic features: r2={:.4} adjusted_r2={:.4}\n",
        r.r2, r.adjusted_r2
    );
    out.push_str("Coefficients:\n");
    for (name, value) in r.names.iter().zip(&r.params) {
        out.push_str(&format!("  {:<24} {value:>12.6}\n", truncate(name, 24)));
    }
    out.push('\n');
    out.push_str(&format_point_forecast("regression", &r.forecast));
    out
}

pub fn format_test_result(r: &TestResult) -> String {
    let mut out = format!(
        "{} test: {} (statistic={:.4}, p-value={:.4}, lags={}",
        r.test,
        if r.stationary { "stationary" } else { "non-stationary" },
        r.statistic,
        r.p_value,
        r.lags
    );
    if let Some(nobs) = r.nobs {
        out.push_str(&format!(", nobs={nobs}"));
    }
    out.push_str(")\n");
    let crit: Vec<String> = r
        .critical_values
        .iter()
        .map(|c| format!("{}: {:.4}", c.level, c.value))
        .collect();
    out.push_str(&format!("  critical values: {}\n", crit.join(", ")));
    if let Some(ic) = r.icbest {
        out.push_str(&format!("  best information criterion: {ic:.4}\n"));
    }
    out
}

pub fn format_strengths(s: &Strengths) -> String {
    format!(
        "Decomposition (period {}): trend strength={:.3} seasonal strength={:.3}\n",
        s.period, s.trend, s.seasonal
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;
    use crate::stats::CriticalValue;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn hours(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        (0..n as i64).map(|h| start + Duration::hours(h)).collect()
    }

    #[test]
    fn frame_preview_aligns_columns() {
        let mut frame = Frame::new("date", hours(3));
        frame.push_column("pm2.5", Column::Float(vec![1.0, f64::NAN, 3.5])).unwrap();
        frame
            .push_column("wind_dir", Column::Text(vec![Some("NW".into()), None, Some("cv".into())]))
            .unwrap();
        let txt = format_frame_preview(&frame, 2);
        let expected = concat!(
            "date                pm2.5 wind_dir\n",
            "2010-01-01 00:00    1.000       NW\n",
            "2010-01-01 01:00      NaN      NaN\n",
            "[3 rows x 2 columns]\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn test_result_lists_critical_values() {
        let r = TestResult {
            test: "ADF",
            stationary: true,
            statistic: -3.5,
            p_value: 0.008,
            lags: 2,
            nobs: Some(97),
            critical_values: vec![
                CriticalValue { level: "1%", value: -3.49 },
                CriticalValue { level: "5%", value: -2.89 },
            ],
            icbest: None,
        };
        let txt = format_test_result(&r);
        assert!(txt.starts_with("ADF test: stationary (statistic=-3.5000, p-value=0.0080, lags=2, nobs=97)"));
        assert!(txt.contains("1%: -3.4900, 5%: -2.8900"));
    }

    #[test]
    fn truncation_marks_cut() {
        assert_eq!(truncate("cum_wind_speed_long", 8), "cum_win.");
        assert_eq!(truncate("temp", 8), "temp");
    }
}
