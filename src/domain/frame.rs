//! Time-indexed containers.
//!
//! `Frame` is a small column store keyed by a `NaiveDateTime` index. Float
//! columns use `NaN` for missing values; text columns use `None`.
//! `TimeSeries` is a single float column pulled out of a frame.

use chrono::NaiveDateTime;

use crate::domain::Frequency;
use crate::error::AppError;

/// A single named float series with a timestamp index.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub name: String,
    pub index: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
    pub freq: Option<Frequency>,
}

impl TimeSeries {
    pub fn new(
        name: impl Into<String>,
        index: Vec<NaiveDateTime>,
        values: Vec<f64>,
    ) -> Result<Self, AppError> {
        if index.len() != values.len() {
            return Err(AppError::data(format!(
                "Index has {} entries but values has {}.",
                index.len(),
                values.len()
            )));
        }
        let freq = Frequency::infer(&index);
        Ok(Self {
            name: name.into(),
            index,
            values,
            freq,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<(NaiveDateTime, f64)> {
        Some((*self.index.first()?, *self.values.first()?))
    }

    pub fn last(&self) -> Option<(NaiveDateTime, f64)> {
        Some((*self.index.last()?, *self.values.last()?))
    }

    /// Declared frequency, or the one implied by a regular index.
    pub fn frequency(&self) -> Result<Frequency, AppError> {
        self.freq.or_else(|| Frequency::infer(&self.index)).ok_or_else(|| {
            AppError::data(format!(
                "Series '{}' has no regular frequency; resample it first.",
                self.name
            ))
        })
    }

    /// Same index and name, different values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, AppError> {
        if values.len() != self.len() {
            return Err(AppError::data(format!(
                "Expected {} values for series '{}', got {}.",
                self.len(),
                self.name,
                values.len()
            )));
        }
        Ok(Self {
            name: self.name.clone(),
            index: self.index.clone(),
            values,
            freq: self.freq,
        })
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Last `n` observations.
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        Self {
            name: self.name.clone(),
            index: self.index[start..].to_vec(),
            values: self.values[start..].to_vec(),
            freq: self.freq,
        }
    }

    /// Finite values only, in order.
    pub fn finite_values(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|v| v.is_finite()).collect()
    }

    pub fn points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Drop observations whose value is missing.
    pub fn dropna(&self) -> Self {
        let (index, values): (Vec<_>, Vec<_>) = self.points().filter(|(_, v)| v.is_finite()).unzip();
        Self {
            name: self.name.clone(),
            freq: Frequency::infer(&index),
            index,
            values,
        }
    }
}

/// One frame column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Column::Float(v) => v.get(row).is_none_or(|x| !x.is_finite()),
            Column::Text(v) => v.get(row).is_none_or(|x| x.is_none()),
        }
    }

    /// Gather rows by position (positions may repeat).
    pub fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Float(v) => Column::Float(rows.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Render a cell for tables and CSV exports (missing → empty string).
    pub fn cell(&self, row: usize) -> String {
        match self {
            Column::Float(v) => match v.get(row) {
                Some(x) if x.is_finite() => format!("{x}"),
                _ => String::new(),
            },
            Column::Text(v) => v.get(row).cloned().flatten().unwrap_or_default(),
        }
    }
}

/// A time-indexed table.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index_name: String,
    pub index: Vec<NaiveDateTime>,
    pub columns: Vec<(String, Column)>,
    pub freq: Option<Frequency>,
}

impl Frame {
    pub fn new(index_name: impl Into<String>, index: Vec<NaiveDateTime>) -> Self {
        let freq = Frequency::infer(&index);
        Self {
            index_name: index_name.into(),
            index,
            columns: Vec::new(),
            freq,
        }
    }

    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), AppError> {
        let name = name.into();
        if column.len() != self.index.len() {
            return Err(AppError::data(format!(
                "Column '{name}' has {} rows but the index has {}.",
                column.len(),
                self.index.len()
            )));
        }
        if self.column(&name).is_some() {
            return Err(AppError::data(format!("Duplicate column '{name}'.")));
        }
        self.columns.push((name, column));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn float_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| matches!(c, Column::Float(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn float(&self, name: &str) -> Result<&[f64], AppError> {
        match self.column(name) {
            Some(Column::Float(v)) => Ok(v),
            Some(Column::Text(_)) => Err(AppError::data(format!("Column '{name}' is not numeric."))),
            None => Err(AppError::data(format!(
                "Unknown column '{name}' (available: {}).",
                self.column_names().join(", ")
            ))),
        }
    }

    /// Extract one float column as a series.
    pub fn series(&self, name: &str) -> Result<TimeSeries, AppError> {
        let values = self.float(name)?.to_vec();
        Ok(TimeSeries {
            name: name.to_string(),
            index: self.index.clone(),
            values,
            freq: self.freq.or_else(|| Frequency::infer(&self.index)),
        })
    }

    /// Keep only rows for which `keep(row)` is true.
    pub fn retain_rows(&mut self, keep: impl Fn(usize) -> bool) {
        let rows: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        *self = self.take_rows(&rows);
    }

    /// Gather rows by position, carrying their timestamps along.
    pub fn take_rows(&self, rows: &[usize]) -> Frame {
        let index: Vec<NaiveDateTime> = rows.iter().map(|&i| self.index[i]).collect();
        let freq = Frequency::infer(&index).or(if rows.len() < 2 { self.freq } else { None });
        Frame {
            index_name: self.index_name.clone(),
            index,
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.take(rows)))
                .collect(),
            freq,
        }
    }

    /// Gather column values by position but keep this frame's index.
    pub fn with_rows_from(&self, rows: &[usize]) -> Result<Frame, AppError> {
        if rows.len() != self.len() {
            return Err(AppError::data(format!(
                "Expected {} row positions, got {}.",
                self.len(),
                rows.len()
            )));
        }
        Ok(Frame {
            index_name: self.index_name.clone(),
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.take(rows)))
                .collect(),
            freq: self.freq,
        })
    }

    pub fn head(&self, n: usize) -> Frame {
        let rows: Vec<usize> = (0..self.len().min(n)).collect();
        self.take_rows(&rows)
    }

    pub fn tail(&self, n: usize) -> Frame {
        let rows: Vec<usize> = (self.len().saturating_sub(n)..self.len()).collect();
        self.take_rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 3, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn sample_frame() -> Frame {
        let mut frame = Frame::new("dt", (1..=4).map(day).collect());
        frame
            .push_column("x", Column::Float(vec![1.0, f64::NAN, 3.0, 4.0]))
            .unwrap();
        frame
            .push_column(
                "dir",
                Column::Text(vec![Some("NE".into()), None, Some("SE".into()), Some("NW".into())]),
            )
            .unwrap();
        frame
    }

    #[test]
    fn series_extraction_and_errors() {
        let frame = sample_frame();
        let s = frame.series("x").unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.freq, Some(Frequency::Days(1)));
        assert_eq!(frame.series("dir").unwrap_err().exit_code(), 3);
        assert_eq!(frame.series("nope").unwrap_err().exit_code(), 3);
    }

    #[test]
    fn retain_and_slices() {
        let mut frame = sample_frame();
        frame.retain_rows(|i| i != 1);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.index[1], day(3));
        assert_eq!(frame.head(2).len(), 2);
        assert_eq!(frame.tail(1).index[0], day(4));
    }

    #[test]
    fn push_rejects_bad_length() {
        let mut frame = sample_frame();
        assert!(frame.push_column("y", Column::Float(vec![1.0])).is_err());
        assert!(frame.push_column("x", Column::Float(vec![0.0; 4])).is_err());
    }

    #[test]
    fn series_dropna_and_tail() {
        let s = sample_frame().series("x").unwrap();
        let clean = s.dropna();
        assert_eq!(clean.values, vec![1.0, 3.0, 4.0]);
        assert_eq!(s.tail(2).values[1], 4.0);
    }
}
