//! Raw CSV tables as downloaded, before any preparation.
//!
//! Everything stays a string here; `RawTable::to_frame` decides per column
//! whether it is numeric.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;

use crate::domain::{Column, Frame};
use crate::error::AppError;

/// Cell spellings treated as missing numbers.
const MISSING_TOKENS: [&str; 6] = ["", "NaN", "nan", "NA", "***", "."];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_csv_str(text: &str) -> Result<Self, AppError> {
        Self::from_reader(text.as_bytes())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::data(format!("Failed to read CSV headers: {e}")))?
            .iter()
            .map(normalize_header_name)
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(AppError::data("CSV has no header row."));
        }

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        loop {
            let more = reader
                .read_record(&mut record)
                .map_err(|e| AppError::data(format!("CSV parse error: {e}")))?;
            if !more {
                break;
            }
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let file = std::fs::File::open(path)
            .map_err(|e| AppError::usage(format!("Failed to open CSV '{}': {e}", path.display())))?;
        Self::from_reader(file)
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), AppError> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| AppError::usage(format!("Failed to create CSV '{}': {e}", path.display())))?;
        writer
            .write_record(&self.headers)
            .map_err(|e| AppError::usage(format!("Failed to write CSV header: {e}")))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| AppError::usage(format!("Failed to write CSV row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::usage(format!("Failed to flush CSV: {e}")))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_columns(&self, names: &[&str]) -> Result<Vec<usize>, AppError> {
        names
            .iter()
            .map(|name| {
                self.column_index(name).ok_or_else(|| {
                    AppError::data(format!(
                        "Missing required column '{name}' (found: {}).",
                        self.headers.join(", ")
                    ))
                })
            })
            .collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row].get(col).map(String::as_str).unwrap_or("")
    }

    pub fn rename_headers(&mut self, rename: impl Fn(&str) -> String) {
        for h in self.headers.iter_mut() {
            *h = rename(h);
        }
    }

    /// Build a frame from the rows kept in `rows`, indexed by `index`.
    ///
    /// Columns listed in `skip` are dropped. A column becomes `Float` when every
    /// cell parses as a number or a missing token, else `Text`.
    pub fn to_frame(
        &self,
        index_name: &str,
        rows: &[usize],
        index: Vec<NaiveDateTime>,
        skip: &[&str],
    ) -> Result<Frame, AppError> {
        let skip: HashSet<&str> = skip.iter().copied().collect();
        let mut frame = Frame::new(index_name, index);

        for (col, name) in self.headers.iter().enumerate() {
            if skip.contains(name.as_str()) {
                continue;
            }
            let cells: Vec<&str> = rows.iter().map(|&r| self.cell(r, col)).collect();
            let numeric: Option<Vec<f64>> = cells.iter().map(|c| parse_number(c)).collect();
            let column = match numeric {
                Some(values) => Column::Float(values),
                None => Column::Text(
                    cells
                        .iter()
                        .map(|c| (!is_missing_token(c)).then(|| c.to_string()))
                        .collect(),
                ),
            };
            frame.push_column(name.clone(), column)?;
        }

        Ok(frame)
    }
}

/// Parse a numeric cell; missing tokens become NaN, anything else non-numeric is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if is_missing_token(trimmed) {
        return Some(f64::NAN);
    }
    let v = trimmed.parse::<f64>().ok()?;
    Some(if v.is_finite() { v } else { f64::NAN })
}

pub fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|v| v.fract() == 0.0).map(|v| v as i64))
}

fn is_missing_token(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

fn normalize_header_name(name: &str) -> String {
    // Some tools emit a UTF-8 BOM before the first header.
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_ragged_csv() {
        let raw = RawTable::from_csv_str("a, b ,c\n1,2,3\n4,5\n\n").unwrap();
        assert_eq!(raw.headers, vec!["a", "b", "c"]);
        assert_eq!(raw.rows, vec![vec!["1", "2", "3"], vec!["4", "5", ""]]);
        assert_eq!(raw.column_index("b"), Some(1));
        assert!(raw.require_columns(&["a", "z"]).is_err());
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number(" 3.5 "), Some(3.5));
        assert!(parse_number("NaN").unwrap().is_nan());
        assert!(parse_number("***").unwrap().is_nan());
        assert_eq!(parse_number("SE"), None);
        assert_eq!(parse_int("2010"), Some(2010));
        assert_eq!(parse_int("3.0"), Some(3));
        assert_eq!(parse_int("x"), None);
    }

    #[test]
    fn to_frame_infers_column_kinds() {
        let raw = RawTable::from_csv_str("k,x,dir\n1,1.5,NE\n2,NA,\n").unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2020, 1, day).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let frame = raw.to_frame("dt", &[0, 1], vec![d(1), d(2)], &["k"]).unwrap();
        assert_eq!(frame.column_names(), vec!["x", "dir"]);
        assert!(frame.float("x").unwrap()[1].is_nan());
        assert_eq!(
            frame.column("dir"),
            Some(&Column::Text(vec![Some("NE".into()), None]))
        );
    }

    #[test]
    fn write_then_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.csv");
        let raw = RawTable::from_csv_str("a,b\n1,x\n").unwrap();
        raw.write_csv(&path).unwrap();
        assert_eq!(RawTable::from_path(&path).unwrap(), raw);
    }
}
