//! Resampling onto a regular grid.
//!
//! Rows are assigned to bins (`Frequency::floor`), and every bin between the
//! first and last observation exists in the output, even when empty. Empty
//! bins aggregate to missing values, which `series::fill` deals with later.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::domain::{Column, Frame, Frequency};
use crate::error::AppError;

/// Upper bound on output bins; guards against resampling minutes over centuries.
const MAX_BINS: usize = 5_000_000;

/// Row membership of each output bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    pub index: Vec<NaiveDateTime>,
    pub members: Vec<Vec<usize>>,
}

/// Assign every row of `index` to its bin at `freq`.
pub fn bin_rows(index: &[NaiveDateTime], freq: Frequency) -> Result<Bins, AppError> {
    let (Some(&min), Some(&max)) = (index.iter().min(), index.iter().max()) else {
        return Ok(Bins {
            index: Vec::new(),
            members: Vec::new(),
        });
    };

    let first = freq.floor(min, min);
    let last = freq.floor(max, min);

    let mut starts = Vec::new();
    let mut t = first;
    while t <= last {
        if starts.len() >= MAX_BINS {
            return Err(AppError::data(format!(
                "Resampling to {freq} would produce more than {MAX_BINS} rows."
            )));
        }
        starts.push(t);
        t = freq
            .advance(t, 1)
            .ok_or_else(|| AppError::runtime(format!("Timestamp overflow while resampling at {t}.")))?;
    }

    let mut members = vec![Vec::new(); starts.len()];
    for (row, &ts) in index.iter().enumerate() {
        let bin = freq.floor(ts, min);
        if let Ok(pos) = starts.binary_search(&bin) {
            members[pos].push(row);
        }
    }

    Ok(Bins {
        index: starts,
        members,
    })
}

/// Mean of the finite values at `rows` (NaN when there are none).
pub fn mean_of(values: &[f64], rows: &[usize]) -> f64 {
    let (sum, count) = rows
        .iter()
        .map(|&i| values[i])
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { f64::NAN } else { sum / count as f64 }
}

/// Max of the finite values at `rows` (NaN when there are none).
pub fn max_of(values: &[f64], rows: &[usize]) -> f64 {
    rows.iter()
        .map(|&i| values[i])
        .filter(|v| v.is_finite())
        .fold(f64::NAN, f64::max)
}

/// Most frequent present value at `rows`; ties go to the smallest value.
pub fn mode_of(values: &[Option<String>], rows: &[usize]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &i in rows {
        if let Some(v) = values[i].as_deref() {
            *counts.entry(v).or_default() += 1;
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string())
}

/// Resample every column: float columns by mean, text columns by mode.
pub fn resample_mean(frame: &Frame, freq: Frequency) -> Result<Frame, AppError> {
    resample_with(frame, freq, mean_of)
}

/// Resample with a custom float aggregator; text columns always take the mode.
pub fn resample_with(
    frame: &Frame,
    freq: Frequency,
    agg: impl Fn(&[f64], &[usize]) -> f64,
) -> Result<Frame, AppError> {
    let bins = bin_rows(&frame.index, freq)?;
    let mut out = Frame::new(frame.index_name.clone(), bins.index.clone());
    out.freq = Some(freq);

    for (name, column) in &frame.columns {
        let aggregated = match column {
            Column::Float(values) => {
                Column::Float(bins.members.iter().map(|rows| agg(values, rows)).collect())
            }
            Column::Text(values) => {
                Column::Text(bins.members.iter().map(|rows| mode_of(values, rows)).collect())
            }
        };
        out.push_column(name.clone(), aggregated)?;
    }

    log::debug!(
        "resampled {} rows into {} bins at {freq}",
        frame.len(),
        out.len()
    );
    Ok(out)
}
