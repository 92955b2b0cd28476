//! Deterministic regression features: piecewise trends and calendar dummies.
//!
//! Terms produce named columns for the observed index (`in_sample`) and for a
//! forecast horizon (`out_of_sample`). `DeterministicProcess` stacks several
//! terms, optionally with a constant, into one design matrix.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use nalgebra::DMatrix;

use crate::error::AppError;

pub mod process;
pub mod seasonality;
pub mod trend;

pub use process::DeterministicProcess;
pub use seasonality::DatetimeAttributeSeasonality;
pub use trend::PiecewiseLinearTrend;

/// Named columns over a timestamp index.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    pub index: Vec<NaiveDateTime>,
    pub names: Vec<String>,
    pub values: DMatrix<f64>,
}

impl Design {
    pub fn from_columns(index: Vec<NaiveDateTime>, columns: Vec<(String, Vec<f64>)>) -> Result<Self, AppError> {
        let nrows = index.len();
        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != nrows) {
            return Err(AppError::data(format!(
                "Feature '{name}' has {} rows but the index has {nrows}.",
                col.len()
            )));
        }
        let values = DMatrix::from_fn(nrows, columns.len(), |r, c| columns[c].1[r]);
        Ok(Self {
            index,
            names: columns.into_iter().map(|(name, _)| name).collect(),
            values,
        })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let pos = self.names.iter().position(|n| n == name)?;
        Some(self.values.column(pos).iter().copied().collect())
    }

    /// Same rows without the first `n` columns.
    pub fn drop_first_columns(&self, n: usize) -> Design {
        let n = n.min(self.ncols());
        Design {
            index: self.index.clone(),
            names: self.names[n..].to_vec(),
            values: self.values.columns(n, self.ncols() - n).into_owned(),
        }
    }
}

pub trait DeterministicTerm: Send + Sync {
    fn name(&self) -> String;

    /// Dummy terms lose their first column when combined with a constant.
    fn is_dummy(&self) -> bool {
        false
    }

    fn in_sample(&self, index: &[NaiveDateTime]) -> Result<Design, AppError>;

    /// Columns for `forecast_index`, which continues `index`.
    fn out_of_sample(&self, index: &[NaiveDateTime], forecast_index: &[NaiveDateTime]) -> Result<Design, AppError>;
}

/// Parse a knot given as `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` (a `T` separator also works).
pub fn parse_knot(raw: &str) -> Result<NaiveDateTime, AppError> {
    let s = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| AppError::usage(format!("Invalid knot '{raw}' (expected YYYY-MM-DD[ HH:MM:SS]).")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knots_parse_dates_and_datetimes() {
        let d = parse_knot("2012-06-01").unwrap();
        assert_eq!(d.to_string(), "2012-06-01 00:00:00");
        assert_eq!(parse_knot("2012-06-01 13:30:00").unwrap().to_string(), "2012-06-01 13:30:00");
        assert_eq!(parse_knot("2012-06-01T13:30:00").unwrap().to_string(), "2012-06-01 13:30:00");
        assert_eq!(parse_knot("June").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn design_columns() {
        let t = parse_knot("2020-01-01").unwrap();
        let design = Design::from_columns(
            vec![t, t],
            vec![("a".into(), vec![1.0, 2.0]), ("b".into(), vec![3.0, 4.0])],
        )
        .unwrap();
        assert_eq!(design.column("b"), Some(vec![3.0, 4.0]));
        let dropped = design.drop_first_columns(1);
        assert_eq!(dropped.names, vec!["b"]);
        assert_eq!(dropped.ncols(), 1);
        assert!(Design::from_columns(vec![t], vec![("a".into(), vec![1.0, 2.0])]).is_err());
    }
}
