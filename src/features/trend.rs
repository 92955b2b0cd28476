use std::fmt;

use chrono::NaiveDateTime;

use crate::error::AppError;
use crate::features::{Design, DeterministicTerm};

/// Linear trend with a change of slope at each knot.
///
/// Column `trend(0)` counts observations from 1; column `trend(i)` for knot
/// `i` counts from 1 at the first observation on or after the knot and is 0
/// before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiecewiseLinearTrend {
    pub knots: Vec<NaiveDateTime>,
}

impl PiecewiseLinearTrend {
    pub fn new(mut knots: Vec<NaiveDateTime>) -> Self {
        knots.sort();
        Self { knots }
    }

    fn column_names(&self) -> Vec<String> {
        (0..=self.knots.len()).map(|i| format!("trend({i})")).collect()
    }

    fn columns(&self, index: &[NaiveDateTime], positions: impl Iterator<Item = f64> + Clone) -> Vec<(String, Vec<f64>)> {
        let mut out = Vec::with_capacity(self.knots.len() + 1);
        let names = self.column_names();
        out.push((names[0].clone(), positions.clone().collect()));
        for (knot, name) in self.knots.iter().zip(&names[1..]) {
            let start = index.partition_point(|t| t < knot) as f64;
            out.push((name.clone(), positions.clone().map(|p| (p - start).max(0.0)).collect()));
        }
        out
    }
}

impl fmt::Display for PiecewiseLinearTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let knots: Vec<String> = self.knots.iter().map(|k| k.to_string()).collect();
        write!(f, "PiecewiseLinearTrend(knots=[{}])", knots.join(", "))
    }
}

impl DeterministicTerm for PiecewiseLinearTrend {
    fn name(&self) -> String {
        self.to_string()
    }

    fn in_sample(&self, index: &[NaiveDateTime]) -> Result<Design, AppError> {
        let n = index.len();
        let positions = (1..=n).map(|p| p as f64);
        Design::from_columns(index.to_vec(), self.columns(index, positions))
    }

    fn out_of_sample(&self, index: &[NaiveDateTime], forecast_index: &[NaiveDateTime]) -> Result<Design, AppError> {
        let n = index.len();
        let positions = (n + 1..=n + forecast_index.len()).map(|p| p as f64);
        Design::from_columns(forecast_index.to_vec(), self.columns(index, positions))
    }
}
