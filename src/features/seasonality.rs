use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::domain::DatetimeAttr;
use crate::error::AppError;
use crate::features::{Design, DeterministicTerm};

/// One 0/1 indicator per distinct value of a calendar attribute.
///
/// Categories come from the in-sample index, sorted, so in-sample and
/// out-of-sample designs always have the same columns. A forecast timestamp
/// whose category never appeared in-sample gets an all-zero row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatetimeAttributeSeasonality {
    pub attr: DatetimeAttr,
}

impl DatetimeAttributeSeasonality {
    pub fn new(attr: DatetimeAttr) -> Self {
        Self { attr }
    }

    fn categories(&self, index: &[NaiveDateTime]) -> Vec<i64> {
        let set: BTreeSet<i64> = index.iter().map(|&t| self.attr.of(t)).collect();
        set.into_iter().collect()
    }

    fn dummies(&self, categories: &[i64], rows: &[NaiveDateTime]) -> Result<Design, AppError> {
        let values: Vec<i64> = rows.iter().map(|&t| self.attr.of(t)).collect();
        let columns = categories
            .iter()
            .map(|&cat| {
                (
                    format!("{}={cat}", self.attr.name()),
                    values.iter().map(|&v| if v == cat { 1.0 } else { 0.0 }).collect(),
                )
            })
            .collect();
        Design::from_columns(rows.to_vec(), columns)
    }
}

impl DeterministicTerm for DatetimeAttributeSeasonality {
    fn name(&self) -> String {
        format!("DatetimeAttributeSeasonality('{}')", self.attr.name())
    }

    fn is_dummy(&self) -> bool {
        true
    }

    fn in_sample(&self, index: &[NaiveDateTime]) -> Result<Design, AppError> {
        self.dummies(&self.categories(index), index)
    }

    fn out_of_sample(&self, index: &[NaiveDateTime], forecast_index: &[NaiveDateTime]) -> Result<Design, AppError> {
        self.dummies(&self.categories(index), forecast_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn hours(start_hour: u32, n: i64) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap().and_hms_opt(start_hour, 0, 0).unwrap();
        (0..n).map(|h| start + Duration::hours(h)).collect()
    }

    #[test]
    fn one_column_per_observed_category() {
        let index = hours(0, 5);
        let term = DatetimeAttributeSeasonality::new(DatetimeAttr::Hour);
        let d = term.in_sample(&index).unwrap();
        assert_eq!(d.names, vec!["hour=0", "hour=1", "hour=2", "hour=3", "hour=4"]);
        for r in 0..5 {
            assert_eq!(d.values.row(r).sum(), 1.0);
            assert_eq!(d.values[(r, r)], 1.0);
        }
        assert!(term.is_dummy());
    }

    #[test]
    fn out_of_sample_reuses_in_sample_categories() {
        let index = hours(0, 3);
        let future = hours(3, 2);
        let term = DatetimeAttributeSeasonality::new(DatetimeAttr::Hour);
        let d = term.out_of_sample(&index, &future).unwrap();
        assert_eq!(d.names, vec!["hour=0", "hour=1", "hour=2"]);
        assert_eq!(d.values.sum(), 0.0);

        let wrapped = hours(0, 26);
        let d = term.out_of_sample(&wrapped[..24], &wrapped[24..]).unwrap();
        assert_eq!(d.ncols(), 24);
        assert_eq!(d.values[(0, 0)], 1.0);
        assert_eq!(d.values[(1, 1)], 1.0);
    }
}
