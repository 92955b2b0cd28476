//! Shared data pipeline used by both CLI and TUI front-ends.
//!
//! settings -> fetch/cache -> raw table -> prepare -> frame -> series
//!
//! The CLI and the TUI then only deal with presentation.

use std::path::{Path, PathBuf};

use crate::cli::{PrepArgs, SourceArgs};
use crate::config::Settings;
use crate::datasets::{Dataset, DatasetId, DatasetInfo, Fetch, HttpFetcher, PrepareOptions, RawTable};
use crate::domain::{Frame, TimeSeries};
use crate::error::AppError;

/// Which dataset to load and how to prepare it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub dataset: DatasetId,
    pub data_dir: Option<PathBuf>,
    pub force: bool,
    pub options: Option<PrepareOptions>,
}

impl DataRequest {
    pub fn new(dataset: DatasetId) -> Self {
        Self {
            dataset,
            data_dir: None,
            force: false,
            options: None,
        }
    }

    pub fn from_source(args: &SourceArgs) -> Self {
        Self {
            dataset: args.dataset,
            data_dir: args.data_dir.clone(),
            force: args.force,
            options: None,
        }
    }

    /// CLI overrides layered on the dataset's defaults.
    pub fn from_prep(args: &PrepArgs) -> Self {
        let mut options = args.source.dataset.dataset().default_options();
        if let Some(freq) = args.freq {
            options.freq = Some(freq);
        }
        if let Some(fill) = args.fill {
            options.fill = fill;
        }
        Self {
            options: Some(options),
            ..Self::from_source(&args.source)
        }
    }
}

/// A prepared dataset ready for analysis.
pub struct Prepared {
    pub id: DatasetId,
    pub info: DatasetInfo,
    pub key_column: &'static str,
    pub raw_rows: usize,
    pub frame: Frame,
}

impl Prepared {
    /// One column as a series; `None` picks the dataset's headline column.
    pub fn series(&self, column: Option<&str>) -> Result<TimeSeries, AppError> {
        self.frame.series(column.unwrap_or(self.key_column))
    }
}

/// Network fetcher configured from the settings.
pub fn http_fetcher(settings: &Settings) -> Result<HttpFetcher, AppError> {
    HttpFetcher::new(settings.http_timeout)
}

pub fn load_raw(settings: &Settings, request: &DataRequest, fetch: &dyn Fetch) -> Result<RawTable, AppError> {
    let data_dir = settings.resolve_data_dir(request.data_dir.as_deref())?;
    load_raw_from(&data_dir, request, fetch)
}

fn load_raw_from(data_dir: &Path, request: &DataRequest, fetch: &dyn Fetch) -> Result<RawTable, AppError> {
    let dataset = request.dataset.dataset();
    let raw = dataset.load(data_dir, request.force, fetch)?;
    log::info!("{}: {} raw rows", dataset.info(), raw.len());
    Ok(raw)
}

/// Load and prepare a dataset.
pub fn prepare(settings: &Settings, request: &DataRequest, fetch: &dyn Fetch) -> Result<Prepared, AppError> {
    let data_dir = settings.resolve_data_dir(request.data_dir.as_deref())?;
    prepare_from(&data_dir, request, fetch)
}

pub fn prepare_from(data_dir: &Path, request: &DataRequest, fetch: &dyn Fetch) -> Result<Prepared, AppError> {
    let dataset: Box<dyn Dataset> = request.dataset.dataset();
    let raw = load_raw_from(data_dir, request, fetch)?;
    let options = request.options.unwrap_or_else(|| dataset.default_options());
    let frame = dataset.prepare(&raw, &options)?;
    log::info!(
        "{}: prepared {} rows x {} columns (freq {:?}, fill {:?})",
        dataset.info(),
        frame.len(),
        frame.columns.len(),
        options.freq,
        options.fill
    );
    Ok(Prepared {
        id: request.dataset,
        info: dataset.info().clone(),
        key_column: dataset.key_column(),
        raw_rows: raw.len(),
        frame,
    })
}

/// Keep only the last `n` observations when asked to.
pub fn maybe_tail(series: TimeSeries, tail: Option<usize>) -> TimeSeries {
    match tail {
        Some(n) => series.tail(n),
        None => series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::cache::tests::CannedFetch;
    use crate::domain::{FillMethod, Frequency};

    #[test]
    fn synthetic_prepares_offline() {
        let dir = tempfile::tempdir().unwrap();
        let fetch = CannedFetch::new("");
        let prepared = prepare_from(dir.path(), &DataRequest::new(DatasetId::Synthetic), &fetch).unwrap();
        assert_eq!(fetch.calls.get(), 0);
        assert_eq!(prepared.key_column, "value");
        let series = prepared.series(None).unwrap();
        assert_eq!(series.len(), prepared.frame.len());
        assert_eq!(series.frequency().unwrap(), Frequency::MonthStart(1));
        assert!(prepared.series(Some("nope")).is_err());
        assert_eq!(maybe_tail(series, Some(12)).len(), 12);
    }

    #[test]
    fn gistemp_goes_through_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let body = concat!(
            "Land-Ocean: Global Means\n",
            "Year,Jan,Feb,Mar,Apr,May,Jun,Jul,Aug,Sep,Oct,Nov,Dec,J-D,D-N,DJF,MAM,JJA,SON\n",
            "1880,-.18,-.24,-.09,-.16,-.10,-.21,-.18,-.10,-.14,-.23,-.22,-.18,-.17,***,***,-.12,-.17,-.20\n",
            "1881,-.19,-.14,.03,.05,.06,-.18,.00,-.03,-.15,-.22,-.18,-.07,-.08,-.09,-.17,.05,-.07,-.18\n",
        );
        let fetch = CannedFetch::new(body);
        let mut request = DataRequest::new(DatasetId::Gistemp);
        request.options = Some(PrepareOptions {
            freq: Some(Frequency::MonthStart(1)),
            fill: FillMethod::Forward,
        });
        let first = prepare_from(dir.path(), &request, &fetch).unwrap();
        let again = prepare_from(dir.path(), &request, &fetch).unwrap();
        assert_eq!(fetch.calls.get(), 1);
        assert_eq!(first.frame.len(), 24);
        assert_eq!(first.raw_rows, again.raw_rows);
        assert_eq!(first.series(None).unwrap().values[2], -0.09);
    }
}
