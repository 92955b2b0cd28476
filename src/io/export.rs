//! Export frames and forecasts to CSV or JSON.
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per timestamp, missing values left blank in CSV and
//! written as `null` in JSON.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::datasets::RawTable;
use crate::domain::{Column, Frame, TimeSeries};
use crate::error::AppError;
use crate::forecast::IntervalForecast;

const TIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn csv_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    ensure_parent(path)?;
    csv::Writer::from_path(path)
        .map_err(|e| AppError::usage(format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn ensure_parent(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::usage(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    Ok(())
}

fn write_row(writer: &mut csv::Writer<File>, row: &[String]) -> Result<(), AppError> {
    writer
        .write_record(row)
        .map_err(|e| AppError::usage(format!("Failed to write export CSV row: {e}")))
}

fn float_cell(v: f64) -> String {
    if v.is_finite() { format!("{v}") } else { String::new() }
}

/// Write a prepared frame: the index column first, then every column in order.
pub fn write_frame_csv(path: &Path, frame: &Frame) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;
    let mut header = vec![frame.index_name.clone()];
    header.extend(frame.columns.iter().map(|(name, _)| name.clone()));
    write_row(&mut writer, &header)?;

    for (row, t) in frame.index.iter().enumerate() {
        let mut record = vec![t.format(TIME_FMT).to_string()];
        for (_, column) in &frame.columns {
            record.push(match column {
                Column::Float(values) => float_cell(values[row]),
                Column::Text(values) => values[row].clone().unwrap_or_default(),
            });
        }
        write_row(&mut writer, &record)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush export CSV: {e}")))
}

/// One forecast row; bounds are absent for point forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub timestamp: NaiveDateTime,
    pub forecast: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastFile {
    pub tool: String,
    pub series: String,
    pub method: String,
    pub level: Option<f64>,
    pub replicates: Option<usize>,
    pub rows: Vec<ForecastRow>,
}

impl ForecastFile {
    pub fn from_point(method: &str, forecast: &TimeSeries) -> Self {
        Self {
            tool: "dives".to_string(),
            series: forecast.name.clone(),
            method: method.to_string(),
            level: None,
            replicates: None,
            rows: forecast
                .points()
                .map(|(timestamp, forecast)| ForecastRow {
                    timestamp,
                    forecast,
                    lower: None,
                    upper: None,
                })
                .collect(),
        }
    }

    pub fn from_intervals(f: &IntervalForecast) -> Self {
        let mut file = Self::from_point(f.method.label(), &f.point);
        file.level = Some(f.level);
        file.replicates = Some(f.replicates);
        for (k, row) in file.rows.iter_mut().enumerate() {
            row.lower = Some(f.lower.values[k]);
            row.upper = Some(f.upper.values[k]);
        }
        file
    }
}

pub fn write_forecast_csv(path: &Path, forecast: &ForecastFile) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;
    let header: Vec<String> = ["timestamp", "forecast", "lower", "upper"].map(String::from).to_vec();
    write_row(&mut writer, &header)?;
    for row in &forecast.rows {
        write_row(
            &mut writer,
            &[
                row.timestamp.format(TIME_FMT).to_string(),
                float_cell(row.forecast),
                row.lower.map(float_cell).unwrap_or_default(),
                row.upper.map(float_cell).unwrap_or_default(),
            ],
        )?;
    }
    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush export CSV: {e}")))
}

pub fn write_forecast_json(path: &Path, forecast: &ForecastFile) -> Result<(), AppError> {
    ensure_parent(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::usage(format!("Failed to create forecast JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, forecast)
        .map_err(|e| AppError::usage(format!("Failed to write forecast JSON: {e}")))
}

/// Copy a raw table (as fetched, preamble already stripped) to `path`.
pub fn write_raw_csv(path: &Path, raw: &RawTable) -> Result<(), AppError> {
    ensure_parent(path)?;
    raw.write_csv(path)
}

/// Write `contents` (e.g. an SVG chart) to `path`, creating parent directories.
pub fn write_text(path: &Path, contents: &str) -> Result<(), AppError> {
    ensure_parent(path)?;
    std::fs::write(path, contents)
        .map_err(|e| AppError::usage(format!("Failed to write '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{naive_forecast, ForecastMethod};
    use chrono::{Duration, NaiveDate};

    fn hours(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        (0..n as i64).map(|h| start + Duration::hours(h)).collect()
    }

    #[test]
    fn frame_csv_blanks_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("frame.csv");
        let mut frame = Frame::new("date", hours(2));
        frame.push_column("pm2.5", Column::Float(vec![12.5, f64::NAN])).unwrap();
        frame
            .push_column("wind_dir", Column::Text(vec![Some("SE".into()), None]))
            .unwrap();
        write_frame_csv(&path, &frame).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "date,pm2.5,wind_dir\n2010-01-01 00:00:00,12.5,SE\n2010-01-01 01:00:00,,\n"
        );
    }

    fn read_forecast_json(path: &Path) -> ForecastFile {
        serde_json::from_reader(File::open(path).unwrap()).unwrap()
    }

    #[test]
    fn forecast_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let series = TimeSeries::new("co2", hours(3), vec![400.0, 401.0, 402.0]).unwrap();
        let point = naive_forecast(&series, 2).unwrap();
        let file = ForecastFile::from_point(ForecastMethod::Naive.label(), &point);
        let path = dir.path().join("f.json");
        write_forecast_json(&path, &file).unwrap();
        let back = read_forecast_json(&path);
        assert_eq!(back, file);
        assert_eq!(back.rows[1].timestamp, hours(5)[4]);

        let csv_path = dir.path().join("f.csv");
        write_forecast_csv(&csv_path, &file).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("timestamp,forecast,lower,upper\n2010-01-01 03:00:00,402,,\n"));
    }
}
