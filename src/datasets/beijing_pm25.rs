//! Beijing PM2.5 (UCI), hourly readings from the US Embassy plus airport weather.
//!
//! Wind needs special handling when resampling: the prevailing direction is the
//! mode of the bin, and the cumulative wind speed is the max over the rows that
//! blew from that direction.

use crate::datasets::raw::{RawTable, parse_int};
use crate::datasets::{
    CsvSource, Dataset, DatasetInfo, PrepareOptions, ensure_not_empty, sorted_rows, timestamp,
};
use crate::domain::{Column, FillMethod, Frame, Frequency};
use crate::error::AppError;
use crate::series::{bin_rows, drop_missing, fill, max_of, mean_of, mode_of};

const SOURCE: CsvSource = CsvSource {
    url: "https://archive.ics.uci.edu/ml/machine-learning-databases/00381/PRSA_data_2010.1.1-2014.12.31.csv",
    skip_rows: 0,
};

const INFO: DatasetInfo = DatasetInfo {
    name: "Beijing PM2.5",
    site_url: "https://archive.ics.uci.edu/ml/datasets/Beijing+PM2.5+Data",
    description: "Particulate matter of size 2.5µm or less (PM2.5) measurements made by the US Embassy \
        in Beijing, as well as meteorological data from Beijing Capital International Airport. \
        Hourly resolution, from 2010-01-01 to 2014-12-31.",
    citation: "Liang, X., Zou, T., Guo, B., Li, S., Zhang, H., Zhang, S., Huang, H. and Chen, S. X. (2015). \
        Assessing Beijing's PM2.5 pollution: severity, weather impact, APEC and winter heating. \
        Proceedings of the Royal Society A, 471, 20150257.",
    download_url: Some(SOURCE.url),
};

pub const KEY: &str = "pm2.5";

const RENAMES: [(&str, &str); 7] = [
    ("DEWP", "dew_point"),
    ("TEMP", "temp"),
    ("PRES", "pressure"),
    ("cbwd", "wind_dir"),
    ("Iws", "cum_wind_speed"),
    ("Is", "hrs_snow"),
    ("Ir", "hrs_rain"),
];

/// Columns aggregated by a plain mean, in output order.
const MEAN_COLUMNS: [&str; 6] = [KEY, "dew_point", "temp", "pressure", "hrs_snow", "hrs_rain"];

pub struct BeijingPm25 {
    info: DatasetInfo,
}

impl BeijingPm25 {
    pub fn new() -> Self {
        Self { info: INFO }
    }
}

impl Default for BeijingPm25 {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset for BeijingPm25 {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn source(&self) -> Option<CsvSource> {
        Some(SOURCE)
    }

    fn default_options(&self) -> PrepareOptions {
        PrepareOptions {
            freq: Some(Frequency::HOURLY),
            fill: FillMethod::Interpolate,
        }
    }

    fn key_column(&self) -> &'static str {
        KEY
    }

    fn prepare(&self, raw: &RawTable, options: &PrepareOptions) -> Result<Frame, AppError> {
        let cols = raw.require_columns(&["year", "month", "day", "hour"])?;

        let mut dated = Vec::with_capacity(raw.len());
        for row in 0..raw.len() {
            let parts: Option<Vec<i64>> = cols.iter().map(|&c| parse_int(raw.cell(row, c))).collect();
            match parts.and_then(|p| timestamp(p[0], p[1], p[2], p[3])) {
                Some(ts) => dated.push((row, ts)),
                None => log::warn!("{}: skipping row {} with invalid date", self.info.name, row + 2),
            }
        }

        let mut raw = raw.clone();
        raw.rename_headers(|h| {
            RENAMES
                .iter()
                .find(|(from, _)| *from == h)
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| h.to_string())
        });
        raw.require_columns(&[KEY, "wind_dir", "cum_wind_speed"])?;

        let (rows, index) = sorted_rows(dated);
        let frame = raw.to_frame("dt", &rows, index, &["No", "year", "month", "day", "hour"])?;

        let resampled = match options.freq {
            Some(freq) => resample_with_wind(&frame, freq)?,
            None => frame,
        };

        let filled = fill(&resampled, options.fill);
        let out = drop_missing(&filled, &[KEY])?;
        ensure_not_empty(&out)?;
        Ok(out)
    }
}

fn resample_with_wind(frame: &Frame, freq: Frequency) -> Result<Frame, AppError> {
    let bins = bin_rows(&frame.index, freq)?;
    let mut out = Frame::new(frame.index_name.clone(), bins.index.clone());
    out.freq = Some(freq);

    for name in MEAN_COLUMNS {
        let values = frame.float(name)?;
        out.push_column(
            name,
            Column::Float(bins.members.iter().map(|rows| mean_of(values, rows)).collect()),
        )?;
    }

    let dirs = match frame.column("wind_dir") {
        Some(Column::Text(v)) => v.clone(),
        Some(Column::Float(v)) => v
            .iter()
            .map(|x| x.is_finite().then(|| x.to_string()))
            .collect(),
        None => return Err(AppError::data("Missing column 'wind_dir'.")),
    };
    let speeds = frame.float("cum_wind_speed")?;

    let mut wind_dir = Vec::with_capacity(bins.members.len());
    let mut cum_wind_speed = Vec::with_capacity(bins.members.len());
    for rows in &bins.members {
        let mode = mode_of(&dirs, rows);
        let matching: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|&r| mode.is_some() && dirs[r] == mode)
            .collect();
        cum_wind_speed.push(max_of(speeds, &matching));
        wind_dir.push(mode);
    }

    out.push_column("wind_dir", Column::Text(wind_dir))?;
    out.push_column("cum_wind_speed", Column::Float(cum_wind_speed))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "No,year,month,day,hour,pm2.5,DEWP,TEMP,PRES,cbwd,Iws,Is,Ir\n\
        1,2010,1,1,0,NA,-21,-11,1021,NW,1.79,0,0\n\
        2,2010,1,1,1,NA,-21,-12,1020,NW,4.92,0,0\n\
        3,2010,1,1,2,120,-20,-12,1020,SE,0.89,0,0\n\
        4,2010,1,1,3,NA,-19,-11,1019,SE,1.78,0,1\n\
        5,2010,1,1,4,140,-18,-10,1018,SE,2.67,0,0\n\
        6,2010,1,1,5,150,-18,-10,1018,cv,0.89,0,0\n";

    fn raw() -> RawTable {
        RawTable::from_csv_str(BODY).unwrap()
    }

    #[test]
    fn hourly_prepare_renames_and_fills() {
        let ds = BeijingPm25::new();
        let frame = ds.prepare(&raw(), &ds.default_options()).unwrap();
        assert_eq!(
            frame.column_names(),
            vec![KEY, "dew_point", "temp", "pressure", "hrs_snow", "hrs_rain", "wind_dir", "cum_wind_speed"]
        );
        // Leading hours without pm2.5 are dropped.
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.float(KEY).unwrap(), &[120.0, 130.0, 140.0, 150.0]);
        assert_eq!(frame.float("cum_wind_speed").unwrap()[0], 0.89);
    }

    #[test]
    fn daily_prepare_uses_wind_mode() {
        let ds = BeijingPm25::new();
        let options = PrepareOptions {
            freq: Some(Frequency::DAILY),
            fill: FillMethod::Forward,
        };
        let frame = ds.prepare(&raw(), &options).unwrap();
        assert_eq!(frame.len(), 1);
        assert!((frame.float(KEY).unwrap()[0] - (120.0 + 140.0 + 150.0) / 3.0).abs() < 1e-9);
        assert_eq!(frame.column("wind_dir"), Some(&Column::Text(vec![Some("SE".into())])));
        // Max cumulative speed among the SE rows only.
        assert_eq!(frame.float("cum_wind_speed").unwrap()[0], 2.67);
    }

    #[test]
    fn missing_columns_are_reported() {
        let raw = RawTable::from_csv_str("year,month,day\n2010,1,1\n").unwrap();
        let err = BeijingPm25::new()
            .prepare(&raw, &BeijingPm25::new().default_options())
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
