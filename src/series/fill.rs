//! Gap filling and dropping of incomplete rows.

use chrono::NaiveDateTime;

use crate::domain::{Column, FillMethod, Frame};
use crate::error::AppError;

/// Fill missing values in every column of `frame`.
///
/// Text columns are always forward-filled; interpolation only applies to floats.
pub fn fill(frame: &Frame, method: FillMethod) -> Frame {
    let mut out = frame.clone();
    for (_, column) in out.columns.iter_mut() {
        match column {
            Column::Float(values) => match method {
                FillMethod::Forward => forward_fill(values),
                FillMethod::Interpolate => interpolate_time(&frame.index, values),
            },
            Column::Text(values) => forward_fill_text(values),
        }
    }
    out
}

pub fn forward_fill(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_finite() {
            last = *v;
        } else {
            *v = last;
        }
    }
}

pub fn forward_fill_text(values: &mut [Option<String>]) {
    let mut last: Option<String> = None;
    for v in values.iter_mut() {
        match v {
            Some(s) => last = Some(s.clone()),
            None => *v = last.clone(),
        }
    }
}

/// Linear interpolation weighted by elapsed time.
///
/// Interior gaps are interpolated, trailing gaps take the last present value,
/// and leading gaps stay missing.
pub fn interpolate_time(index: &[NaiveDateTime], values: &mut [f64]) {
    let present: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_finite()).collect();
    let Some(&last_present) = present.last() else {
        return;
    };

    for w in present.windows(2) {
        let (p, q) = (w[0], w[1]);
        if q - p < 2 {
            continue;
        }
        let span = (index[q] - index[p]).num_seconds() as f64;
        for i in (p + 1)..q {
            let u = if span > 0.0 {
                (index[i] - index[p]).num_seconds() as f64 / span
            } else {
                0.0
            };
            values[i] = values[p] + u * (values[q] - values[p]);
        }
    }

    let tail = values[last_present];
    for v in values.iter_mut().skip(last_present + 1) {
        *v = tail;
    }
}

/// Drop rows where any column in `subset` is missing.
pub fn drop_missing(frame: &Frame, subset: &[&str]) -> Result<Frame, AppError> {
    let mut columns = Vec::with_capacity(subset.len());
    for name in subset {
        let column = frame
            .column(name)
            .ok_or_else(|| AppError::data(format!("Unknown column '{name}' in dropna subset.")))?;
        columns.push(column);
    }

    let mut out = frame.clone();
    out.retain_rows(|row| columns.iter().all(|c| !c.is_missing(row)));
    Ok(out)
}
