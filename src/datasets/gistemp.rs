//! NASA GISTEMP v4 global Land-Ocean Temperature Index, monthly.
//!
//! The raw table is wide (one row per year, one column per month plus seasonal
//! and annual means); preparation unpivots the month columns into a monthly
//! series.

use crate::datasets::raw::{RawTable, parse_int, parse_number};
use crate::datasets::{CsvSource, Dataset, DatasetInfo, PrepareOptions, ensure_not_empty, sorted_rows, timestamp};
use crate::domain::{Column, FillMethod, Frame, Frequency};
use crate::error::AppError;
use crate::series::resample_mean;

const SOURCE: CsvSource = CsvSource {
    url: "https://data.giss.nasa.gov/gistemp/tabledata_v4/GLB.Ts+dSST.csv",
    skip_rows: 1,
};

const INFO: DatasetInfo = DatasetInfo {
    name: "GISTEMP",
    site_url: "https://data.giss.nasa.gov/gistemp",
    description: "Estimates of global surface temperature change based on combined land-surface air and \
        sea-surface water temperature anomalies, expressed as a Land-Ocean Temperature Index (LOTI) \
        measured relative to average temps over 1951-1980 for the given place and time of year. \
        Global mean with monthly resolution, 1880 – Present.",
    citation: "Lenssen, N., G. Schmidt, J. Hansen, M. Menne, A. Persin, R. Ruedy, and D. Zyss, 2019: \
        Improvements in the GISTEMP uncertainty model. J. Geophys. Res. Atmos., 124, no. 12, 6307-6326, \
        doi:10.1029/2018JD029522.",
    download_url: Some(SOURCE.url),
};

pub const KEY: &str = "LOTI";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub struct Gistemp {
    info: DatasetInfo,
}

impl Gistemp {
    pub fn new() -> Self {
        Self { info: INFO }
    }
}

impl Default for Gistemp {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset for Gistemp {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn source(&self) -> Option<CsvSource> {
        Some(SOURCE)
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

    /// Unpivot months, then resample to month starts.
    ///
    /// Missing cells (`***`) are dropped rather than filled, so the frame ends at
    /// the latest published month; `options.fill` is not applied.
    fn prepare(&self, raw: &RawTable, options: &PrepareOptions) -> Result<Frame, AppError> {
        let year_col = raw.require_columns(&["Year"])?[0];
        let month_cols = raw.require_columns(&MONTHS)?;

        let mut stacked = Vec::new();
        let mut values = Vec::new();
        for row in 0..raw.len() {
            let Some(year) = parse_int(raw.cell(row, year_col)) else {
                log::warn!("{}: skipping row {} without a year", self.info.name, row + 2);
                continue;
            };
            for (m, &col) in month_cols.iter().enumerate() {
                let value = parse_number(raw.cell(row, col)).unwrap_or(f64::NAN);
                if !value.is_finite() {
                    continue;
                }
                if let Some(ts) = timestamp(year, m as i64 + 1, 1, 0) {
                    stacked.push((values.len(), ts));
                    values.push(value);
                }
            }
        }

        let (rows, index) = sorted_rows(stacked);
        let mut frame = Frame::new("dt", index);
        frame.push_column(KEY, Column::Float(rows.iter().map(|&i| values[i]).collect()))?;
        ensure_not_empty(&frame)?;

        let freq = options.freq.unwrap_or(Frequency::MONTHLY);
        let out = resample_mean(&frame, freq)?;
        ensure_not_empty(&out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const BODY: &str = "Year,Jan,Feb,Mar,Apr,May,Jun,Jul,Aug,Sep,Oct,Nov,Dec,J-D,D-N,DJF,MAM,JJA,SON\n\
        1880,-.18,-.24,-.09,-.16,-.10,-.21,-.18,-.10,-.14,-.23,-.22,-.17,-.17,***,***,-.12,-.17,-.20\n\
        1881,-.19,-.14,.04,.05,.07,-.18,.01,-.03,-.15,-.22,-.18,-.07,-.08,-.09,-.17,.06,-.07,-.19\n\
        1882,.16,.14,***,***,***,***,***,***,***,***,***,***,***,***,***,***,***,***\n";

    #[test]
    fn unpivots_and_trims_unpublished_months() {
        let raw = RawTable::from_csv_str(BODY).unwrap();
        let ds = Gistemp::new();
        let frame = ds.prepare(&raw, &ds.default_options()).unwrap();

        assert_eq!(frame.column_names(), vec![KEY]);
        assert_eq!(frame.index_name, "dt");
        assert_eq!(frame.len(), 26);
        assert_eq!(frame.freq, Some(Frequency::MonthStart(1)));
        let first = NaiveDate::from_ymd_opt(1880, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(frame.index[0], first);
        let loti = frame.float(KEY).unwrap();
        assert_eq!(loti[0], -0.18);
        assert_eq!(loti[25], 0.14);
    }

    #[test]
    fn all_missing_is_a_data_error() {
        let raw = RawTable::from_csv_str(
            "Year,Jan,Feb,Mar,Apr,May,Jun,Jul,Aug,Sep,Oct,Nov,Dec\n1880,***,***,***,***,***,***,***,***,***,***,***,***\n",
        )
        .unwrap();
        let err = Gistemp::new()
            .prepare(&raw, &Gistemp::new().default_options())
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
