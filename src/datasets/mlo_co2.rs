//! In-situ CO2 at Mauna Loa Observatory (Scripps), daily resolution.

use crate::datasets::raw::{RawTable, parse_int};
use crate::datasets::{
    CsvSource, Dataset, DatasetInfo, PrepareOptions, resample_fill_drop, sorted_rows, timestamp,
};
use crate::domain::{Column, FillMethod, Frame, Frequency};
use crate::error::AppError;

const SOURCE: CsvSource = CsvSource {
    url: "https://scrippsco2.ucsd.edu/assets/data/atmospheric/stations/in_situ_co2/daily/daily_in_situ_co2_mlo.csv",
    skip_rows: 33,
};

const INFO: DatasetInfo = DatasetInfo {
    name: "MLO CO2",
    site_url: "https://scrippsco2.ucsd.edu/data/atmospheric_co2/mlo.html",
    description: "In-situ CO2 measurements taken at Mauna Loa Observatory, Hawaii \
        (Latitude 19.5°N, Longitude 155.6°W, Elevation 3397m). \
        Daily resolution, from 1958 – Present.",
    citation: "C. D. Keeling, S. C. Piper, R. B. Bacastow, M. Wahlen, T. P. Whorf, M. Heimann, and H. A. Meijer, \
        Exchanges of atmospheric CO2 and 13CO2 with the terrestrial biosphere and oceans from 1978 to 2000. \
        I. Global aspects, SIO Reference Series, No. 01-06, Scripps Institution of Oceanography, San Diego, \
        88 pages, 2001.",
    download_url: Some(SOURCE.url),
};

pub const KEY: &str = "CO2";

const DROP: [&str; 5] = ["Yr", "Mn", "Dy", "NB", "scale"];

pub struct MloCo2 {
    info: DatasetInfo,
}

impl MloCo2 {
    pub fn new() -> Self {
        Self { info: INFO }
    }
}

impl Default for MloCo2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset for MloCo2 {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn source(&self) -> Option<CsvSource> {
        Some(SOURCE)
    }

    fn default_options(&self) -> PrepareOptions {
        PrepareOptions {
            freq: Some(Frequency::DAILY),
            fill: FillMethod::Interpolate,
        }
    }

    fn key_column(&self) -> &'static str {
        KEY
    }

    fn prepare(&self, raw: &RawTable, options: &PrepareOptions) -> Result<Frame, AppError> {
        // Header cells carry stray '%' and padding, e.g. "%      Yr".
        let mut raw = raw.clone();
        raw.rename_headers(|h| h.trim_matches(|c| c == '%' || c == ' ').to_string());

        let cols = raw.require_columns(&["Yr", "Mn", "Dy", KEY])?;
        let (yr, mn, dy) = (cols[0], cols[1], cols[2]);

        let mut dated = Vec::with_capacity(raw.len());
        let mut skipped = 0usize;
        for row in 0..raw.len() {
            let ts = parse_int(raw.cell(row, yr))
                .zip(parse_int(raw.cell(row, mn)))
                .zip(parse_int(raw.cell(row, dy)))
                .and_then(|((y, m), d)| timestamp(y, m, d, 0));
            match ts {
                Some(ts) => dated.push((row, ts)),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!("{}: skipped {skipped} rows with invalid dates", self.info.name);
        }

        let (rows, index) = sorted_rows(dated);
        let mut frame = raw.to_frame("dt", &rows, index, &DROP)?;

        // Only numeric columns survive a mean resample; the station code is text.
        frame.columns.retain(|(_, c)| matches!(c, Column::Float(_)));
        if frame.column(KEY).is_none() {
            return Err(AppError::data("MLO CO2 column 'CO2' is not numeric."));
        }

        resample_fill_drop(&frame, options, KEY)
    }
}
