//! Public datasets used by the dives.
//!
//! Each dataset knows where its raw CSV lives (`source`), how to turn the raw
//! table into an analysis-ready frame (`prepare`), and which column carries the
//! headline measurement (`key_column`). Loading goes through the on-disk cache
//! in `cache`.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use serde::Serialize;

use crate::domain::{FillMethod, Frame, Frequency};
use crate::error::AppError;

pub mod beijing_pm25;
pub mod cache;
pub mod gistemp;
pub mod mlo_co2;
pub mod raw;
pub mod synthetic;

pub use cache::{CsvSource, Fetch, HttpFetcher, cache_path, file_name_from_url, load_csv_data};
pub use raw::RawTable;

/// Name, provenance, and citation for a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    pub name: &'static str,
    pub site_url: &'static str,
    pub description: &'static str,
    pub citation: &'static str,
    pub download_url: Option<&'static str>,
}

impl std::fmt::Display for DatasetInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dataset('{}')", self.name)
    }
}

/// Options controlling `Dataset::prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Target frequency; `None` keeps the dataset's native resolution.
    pub freq: Option<Frequency>,
    pub fill: FillMethod,
}

pub trait Dataset: Send + Sync {
    fn info(&self) -> &DatasetInfo;

    /// Remote CSV location; `None` for datasets generated locally.
    fn source(&self) -> Option<CsvSource>;

    fn default_options(&self) -> PrepareOptions;

    /// Column that must be present for a row to survive preparation.
    fn key_column(&self) -> &'static str;

    /// Turn the raw table into a regular, gap-filled frame.
    fn prepare(&self, raw: &RawTable, options: &PrepareOptions) -> Result<Frame, AppError>;

    /// Load the raw table, from `data_dir` when cached or from the source URL otherwise.
    fn load(&self, data_dir: &Path, force: bool, fetch: &dyn Fetch) -> Result<RawTable, AppError> {
        let source = self.source().ok_or_else(|| {
            AppError::usage(format!("{} has no download source.", self.info()))
        })?;
        let path = cache_path(data_dir, source.url)?;
        load_csv_data(&path, &source, force, fetch)
    }
}

/// Dataset selector used by the CLI and the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatasetId {
    MloCo2,
    BeijingPm25,
    Gistemp,
    Synthetic,
}

impl DatasetId {
    pub const ALL: [DatasetId; 4] = [
        DatasetId::MloCo2,
        DatasetId::BeijingPm25,
        DatasetId::Gistemp,
        DatasetId::Synthetic,
    ];

    pub fn dataset(self) -> Box<dyn Dataset> {
        match self {
            DatasetId::MloCo2 => Box::new(mlo_co2::MloCo2::new()),
            DatasetId::BeijingPm25 => Box::new(beijing_pm25::BeijingPm25::new()),
            DatasetId::Gistemp => Box::new(gistemp::Gistemp::new()),
            DatasetId::Synthetic => Box::new(synthetic::Synthetic::default()),
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            DatasetId::MloCo2 => "mlo-co2",
            DatasetId::BeijingPm25 => "beijing-pm25",
            DatasetId::Gistemp => "gistemp",
            DatasetId::Synthetic => "synthetic",
        }
    }

    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|&d| d == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }
}

/// Shared tail of most `prepare` implementations: resample by mean, fill, drop rows missing `key`.
pub(crate) fn resample_fill_drop(
    frame: &Frame,
    options: &PrepareOptions,
    key: &str,
) -> Result<Frame, AppError> {
    let resampled = match options.freq {
        Some(freq) => crate::series::resample_mean(frame, freq)?,
        None => frame.clone(),
    };
    let filled = crate::series::fill(&resampled, options.fill);
    let out = crate::series::drop_missing(&filled, &[key])?;
    ensure_not_empty(&out)?;
    Ok(out)
}

pub(crate) fn ensure_not_empty(frame: &Frame) -> Result<(), AppError> {
    if frame.is_empty() {
        return Err(AppError::data("No rows remain after preparation."));
    }
    Ok(())
}

/// Build a timestamp from calendar parts, `None` when they do not form a valid date.
pub(crate) fn timestamp(year: i64, month: i64, day: i64, hour: i64) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )?;
    let time = NaiveTime::from_hms_opt(u32::try_from(hour).ok()?, 0, 0)?;
    Some(date.and_time(time))
}

/// Sort rows chronologically, returning positions and timestamps.
pub(crate) fn sorted_rows(mut rows: Vec<(usize, NaiveDateTime)>) -> (Vec<usize>, Vec<NaiveDateTime>) {
    rows.sort_by_key(|&(pos, ts)| (ts, pos));
    rows.into_iter().unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_display_and_registry() {
        for id in DatasetId::ALL {
            let ds = id.dataset();
            assert!(ds.info().to_string().starts_with("Dataset('"));
            assert!(!ds.key_column().is_empty());
        }
        assert_eq!(DatasetId::Synthetic.next(), DatasetId::MloCo2);
    }

    #[test]
    fn timestamps_validate_parts() {
        assert!(timestamp(2010, 2, 29, 0).is_none());
        assert!(timestamp(2012, 2, 29, 23).is_some());
        assert!(timestamp(2012, 1, 1, 24).is_none());
    }
}
