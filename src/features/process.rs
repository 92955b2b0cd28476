use chrono::NaiveDateTime;

use crate::domain::Frequency;
use crate::error::AppError;
use crate::features::{Design, DeterministicTerm};

/// A constant plus any number of deterministic terms over a fixed index.
pub struct DeterministicProcess {
    index: Vec<NaiveDateTime>,
    pub constant: bool,
    terms: Vec<Box<dyn DeterministicTerm>>,
}

impl DeterministicProcess {
    pub fn new(index: Vec<NaiveDateTime>, constant: bool, terms: Vec<Box<dyn DeterministicTerm>>) -> Self {
        Self {
            index,
            constant,
            terms,
        }
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn term_names(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.name()).collect()
    }

    pub fn in_sample(&self) -> Result<Design, AppError> {
        let designs = self
            .terms
            .iter()
            .map(|t| t.in_sample(&self.index))
            .collect::<Result<Vec<_>, _>>()?;
        self.stack(self.index.clone(), designs)
    }

    /// Design for the `steps` periods after the sample.
    ///
    /// Without an explicit `forecast_index`, the index continues at the
    /// sample's inferred frequency.
    pub fn out_of_sample(
        &self,
        steps: usize,
        forecast_index: Option<Vec<NaiveDateTime>>,
    ) -> Result<Design, AppError> {
        let forecast_index = match forecast_index {
            Some(idx) if idx.len() != steps => {
                return Err(AppError::usage(format!(
                    "Forecast index has {} entries, expected {steps}.",
                    idx.len()
                )));
            }
            Some(idx) => idx,
            None => {
                let freq = Frequency::infer(&self.index).ok_or_else(|| {
                    AppError::data("Cannot extend an index without a regular frequency.")
                })?;
                let last = *self
                    .index
                    .last()
                    .ok_or_else(|| AppError::data("Cannot extend an empty index."))?;
                freq.range_after(last, steps)?
            }
        };

        let designs = self
            .terms
            .iter()
            .map(|t| t.out_of_sample(&self.index, &forecast_index))
            .collect::<Result<Vec<_>, _>>()?;
        self.stack(forecast_index, designs)
    }

    fn stack(&self, index: Vec<NaiveDateTime>, designs: Vec<Design>) -> Result<Design, AppError> {
        let n = index.len();
        let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
        if self.constant {
            columns.push(("const".to_string(), vec![1.0; n]));
        }
        for (term, design) in self.terms.iter().zip(designs) {
            let design = if self.constant && term.is_dummy() {
                design.drop_first_columns(1)
            } else {
                design
            };
            for (c, name) in design.names.iter().enumerate() {
                if columns.iter().any(|(existing, _)| existing == name) {
                    return Err(AppError::usage(format!("Duplicate feature column '{name}'.")));
                }
                columns.push((name.clone(), design.values.column(c).iter().copied().collect()));
            }
        }
        Design::from_columns(index, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DatetimeAttr;
    use crate::features::{DatetimeAttributeSeasonality, PiecewiseLinearTrend};
    use chrono::NaiveDate;

    fn months(n: usize) -> Vec<NaiveDateTime> {
        (0..n)
            .map(|i| {
                NaiveDate::from_ymd_opt(2019 + (i / 12) as i32, (i % 12) as u32 + 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            })
            .collect()
    }

    fn process(constant: bool) -> DeterministicProcess {
        DeterministicProcess::new(
            months(24),
            constant,
            vec![
                Box::new(PiecewiseLinearTrend::new(vec![months(24)[12]])),
                Box::new(DatetimeAttributeSeasonality::new(DatetimeAttr::Month)),
            ],
        )
    }

    #[test]
    fn constant_drops_first_dummy() {
        let d = process(true).in_sample().unwrap();
        assert_eq!(d.ncols(), 1 + 2 + 11);
        assert_eq!(d.names[0], "const");
        assert_eq!(d.names[3], "month=2");

        let d = process(false).in_sample().unwrap();
        assert_eq!(d.ncols(), 2 + 12);
        assert_eq!(d.names[2], "month=1");
    }

    #[test]
    fn out_of_sample_lines_up_with_in_sample() {
        let p = process(true);
        let ins = p.in_sample().unwrap();
        let oos = p.out_of_sample(3, None).unwrap();
        assert_eq!(oos.names, ins.names);
        assert_eq!(oos.nrows(), 3);
        assert_eq!(oos.index[0], months(25)[24]);
        assert_eq!(oos.column("trend(0)").unwrap(), vec![25.0, 26.0, 27.0]);
        // January is the dropped baseline, so February is the first indicator.
        assert_eq!(oos.column("month=2").unwrap(), vec![0.0, 1.0, 0.0]);
        assert!(p.out_of_sample(2, Some(months(1))).is_err());
    }
}
