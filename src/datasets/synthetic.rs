//! Offline monthly series: linear trend, annual cycle, Gaussian noise.
//!
//! Handy for trying dives without network access. The raw table is generated
//! in memory from a fixed seed and goes through the same `prepare` path as the
//! downloaded datasets.

use std::f64::consts::PI;
use std::path::Path;

use chrono::{Months, NaiveDate, NaiveTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::datasets::raw::{RawTable, parse_number};
use crate::datasets::{CsvSource, Dataset, DatasetInfo, Fetch, PrepareOptions, resample_fill_drop, sorted_rows};
use crate::domain::{Column, FillMethod, Frame, Frequency};
use crate::error::AppError;

const INFO: DatasetInfo = DatasetInfo {
    name: "Synthetic",
    site_url: "https://en.wikipedia.org/wiki/Decomposition_of_time_series",
    description: "Seeded monthly series made of a linear trend, an annual sinusoidal cycle, and \
        Gaussian noise, with a few readings knocked out. Generated locally, no download needed.",
    citation: "Generated data; no citation required.",
    download_url: None,
};

pub const KEY: &str = "value";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct Synthetic {
    info: DatasetInfo,
    pub start: NaiveDate,
    pub months: usize,
    pub seed: u64,
    pub level: f64,
    /// Increase per month.
    pub slope: f64,
    pub amplitude: f64,
    pub noise_sd: f64,
    /// Probability that a reading is left blank.
    pub missing_prob: f64,
}

impl Default for Synthetic {
    fn default() -> Self {
        Self {
            info: INFO,
            start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            months: 240,
            seed: 20_240,
            level: 10.0,
            slope: 0.05,
            amplitude: 2.0,
            noise_sd: 0.5,
            missing_prob: 0.02,
        }
    }
}

impl Synthetic {
    /// Build the raw `date,value` table.
    pub fn generate(&self) -> Result<RawTable, AppError> {
        if self.months == 0 {
            return Err(AppError::usage("Synthetic series needs at least one month."));
        }
        if !(0.0..1.0).contains(&self.missing_prob) {
            return Err(AppError::usage("Synthetic missing probability must be in [0, 1)."));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = Normal::new(0.0, self.noise_sd)
            .map_err(|e| AppError::runtime(format!("Noise distribution error: {e}")))?;

        let mut rows = Vec::with_capacity(self.months);
        for t in 0..self.months {
            let date = self
                .start
                .checked_add_months(Months::new(t as u32))
                .ok_or_else(|| AppError::usage("Synthetic date range overflows the calendar."))?;
            let x = t as f64;
            let value = self.level
                + self.slope * x
                + self.amplitude * (2.0 * PI * x / 12.0).sin()
                + noise.sample(&mut rng);
            // Always draw, so the noise sequence does not depend on missing_prob.
            let blank = rng.r#gen::<f64>() < self.missing_prob;
            let cell = if blank { String::new() } else { format!("{value:.4}") };
            rows.push(vec![date.format(DATE_FORMAT).to_string(), cell]);
        }

        Ok(RawTable {
            headers: vec!["date".to_string(), KEY.to_string()],
            rows,
        })
    }
}

impl Dataset for Synthetic {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn source(&self) -> Option<CsvSource> {
        None
    }

    fn default_options(&self) -> PrepareOptions {
        PrepareOptions {
            freq: Some(Frequency::MONTHLY),
            fill: FillMethod::Interpolate,
        }
    }

    fn key_column(&self) -> &'static str {
        KEY
    }

    fn load(&self, _data_dir: &Path, _force: bool, _fetch: &dyn Fetch) -> Result<RawTable, AppError> {
        self.generate()
    }

    fn prepare(&self, raw: &RawTable, options: &PrepareOptions) -> Result<Frame, AppError> {
        let cols = raw.require_columns(&["date", KEY])?;

        let mut dated = Vec::with_capacity(raw.len());
        for row in 0..raw.len() {
            match NaiveDate::parse_from_str(raw.cell(row, cols[0]), DATE_FORMAT) {
                Ok(d) => dated.push((row, d.and_time(NaiveTime::MIN))),
                Err(_) => log::warn!("{}: skipping row {} with invalid date", self.info.name, row + 2),
            }
        }

        let (rows, index) = sorted_rows(dated);
        let values: Vec<f64> = rows
            .iter()
            .map(|&r| parse_number(raw.cell(r, cols[1])).unwrap_or(f64::NAN))
            .collect();
        let mut frame = Frame::new("dt", index);
        frame.push_column(KEY, Column::Float(values))?;

        resample_fill_drop(&frame, options, KEY)
    }
}
