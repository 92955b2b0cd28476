//! Regular calendar frequencies, spelled the way pandas spells offset aliases.
//!
//! Only the handful of aliases the datasets need are supported:
//! minutes (`min`/`T`), hours (`H`), days (`D`), and month starts (`MS`),
//! each with an optional positive multiplier (`3H`, `2MS`).

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Minutes(u32),
    Hours(u32),
    Days(u32),
    MonthStart(u32),
}

impl Frequency {
    pub const HOURLY: Frequency = Frequency::Hours(1);
    pub const DAILY: Frequency = Frequency::Days(1);
    pub const MONTHLY: Frequency = Frequency::MonthStart(1);

    /// Parse an offset alias such as `"1H"`, `"D"`, `"MS"`, or `"15min"`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let s = raw.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);

        let n = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|e| AppError::usage(format!("Invalid frequency multiplier in '{raw}': {e}")))?
        };
        if n == 0 {
            return Err(AppError::usage(format!("Frequency multiplier must be > 0 (got '{raw}').")));
        }

        match unit {
            "min" | "T" => Ok(Frequency::Minutes(n)),
            "H" | "h" => Ok(Frequency::Hours(n)),
            "D" | "d" => Ok(Frequency::Days(n)),
            "MS" => Ok(Frequency::MonthStart(n)),
            _ => Err(AppError::usage(format!(
                "Unsupported frequency '{raw}' (expected e.g. 15min, 1H, 1D, MS)."
            ))),
        }
    }

    /// Length of one period, when it is a fixed duration.
    pub fn fixed_duration(self) -> Option<Duration> {
        match self {
            Frequency::Minutes(n) => Some(Duration::minutes(i64::from(n))),
            Frequency::Hours(n) => Some(Duration::hours(i64::from(n))),
            Frequency::Days(n) => Some(Duration::days(i64::from(n))),
            Frequency::MonthStart(_) => None,
        }
    }

    /// Move `t` by `k` periods (negative `k` moves backwards).
    pub fn advance(self, t: NaiveDateTime, k: i64) -> Option<NaiveDateTime> {
        match self {
            Frequency::MonthStart(n) => {
                let months = i64::from(n).checked_mul(k)?;
                let step = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
                if months >= 0 {
                    t.checked_add_months(step)
                } else {
                    t.checked_sub_months(step)
                }
            }
            fixed => {
                let step = fixed.fixed_duration()?;
                let total = step.checked_mul(i32::try_from(k).ok()?)?;
                t.checked_add_signed(total)
            }
        }
    }

    /// The `steps` timestamps following `last`, one period apart.
    pub fn range_after(self, last: NaiveDateTime, steps: usize) -> Result<Vec<NaiveDateTime>, AppError> {
        (1..=steps as i64)
            .map(|k| {
                self.advance(last, k).ok_or_else(|| {
                    AppError::runtime(format!("Timestamp overflow extending {last} by {k} x {self}."))
                })
            })
            .collect()
    }

    /// Start of the bin that contains `t`.
    ///
    /// Fixed-duration bins are anchored at midnight of `origin`'s day; month bins
    /// are anchored at the first day of `origin`'s month.
    pub fn floor(self, t: NaiveDateTime, origin: NaiveDateTime) -> NaiveDateTime {
        match self {
            Frequency::MonthStart(n) => {
                let base = month_start(origin);
                let months = i64::from(t.year() - base.year()) * 12 + i64::from(t.month0())
                    - i64::from(base.month0());
                let bin = months.div_euclid(i64::from(n)) * i64::from(n);
                Frequency::MonthStart(1).advance(base, bin).unwrap_or(base)
            }
            fixed => {
                let base = origin.date().and_time(NaiveTime::MIN);
                let step = fixed.fixed_duration().map(|d| d.num_seconds()).unwrap_or(1).max(1);
                let elapsed = (t - base).num_seconds();
                let bins = elapsed.div_euclid(step);
                base + Duration::seconds(bins * step)
            }
        }
    }

    /// Infer a frequency from a strictly regular index.
    pub fn infer(index: &[NaiveDateTime]) -> Option<Self> {
        if index.len() < 2 {
            return None;
        }

        if index.iter().all(|t| *t == month_start(*t)) {
            let gaps: Vec<i64> = index
                .windows(2)
                .map(|w| {
                    i64::from(w[1].year() - w[0].year()) * 12 + i64::from(w[1].month0())
                        - i64::from(w[0].month0())
                })
                .collect();
            let first = gaps[0];
            if first > 0 && gaps.iter().all(|&g| g == first) {
                return u32::try_from(first).ok().map(Frequency::MonthStart);
            }
        }

        let step = (index[1] - index[0]).num_seconds();
        if step <= 0 || index.windows(2).any(|w| (w[1] - w[0]).num_seconds() != step) {
            return None;
        }

        let as_u32 = |v: i64| u32::try_from(v).ok();
        if step % 86_400 == 0 {
            as_u32(step / 86_400).map(Frequency::Days)
        } else if step % 3_600 == 0 {
            as_u32(step / 3_600).map(Frequency::Hours)
        } else if step % 60 == 0 {
            as_u32(step / 60).map(Frequency::Minutes)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Minutes(n) => write!(f, "{n}min"),
            Frequency::Hours(n) => write!(f, "{n}H"),
            Frequency::Days(n) => write!(f, "{n}D"),
            Frequency::MonthStart(n) => write!(f, "{n}MS"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Frequency::parse(s)
    }
}

/// Midnight on the first day of `t`'s month.
pub fn month_start(t: NaiveDateTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(t.year(), t.month(), 1)
        .map(|d| d.and_time(NaiveTime::MIN))
        .unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn parses_offset_aliases() {
        assert_eq!(Frequency::parse("1H").unwrap(), Frequency::Hours(1));
        assert_eq!(Frequency::parse("h").unwrap(), Frequency::Hours(1));
        assert_eq!(Frequency::parse("3H").unwrap(), Frequency::Hours(3));
        assert_eq!(Frequency::parse("D").unwrap(), Frequency::Days(1));
        assert_eq!(Frequency::parse("MS").unwrap(), Frequency::MonthStart(1));
        assert_eq!(Frequency::parse("15min").unwrap(), Frequency::Minutes(15));
        assert_eq!(Frequency::parse("15T").unwrap(), Frequency::Minutes(15));
        assert!(Frequency::parse("0D").is_err());
        assert!(Frequency::parse("1W").is_err());
        assert_eq!(Frequency::Days(1).to_string(), "1D");
    }

    #[test]
    fn advance_handles_months_and_fixed_steps() {
        let t = dt(2020, 1, 31, 0);
        assert_eq!(Frequency::Days(1).advance(t, 1), Some(dt(2020, 2, 1, 0)));
        assert_eq!(Frequency::Hours(6).advance(t, -1), Some(dt(2020, 1, 30, 18)));
        let m = dt(2020, 11, 1, 0);
        assert_eq!(Frequency::MonthStart(1).advance(m, 2), Some(dt(2021, 1, 1, 0)));
        assert_eq!(Frequency::MonthStart(1).advance(m, -11), Some(dt(2019, 12, 1, 0)));
    }

    #[test]
    fn range_after_continues_the_grid() {
        let last = dt(2021, 12, 1, 0);
        assert_eq!(
            Frequency::MonthStart(1).range_after(last, 2).unwrap(),
            vec![dt(2022, 1, 1, 0), dt(2022, 2, 1, 0)]
        );
        assert!(Frequency::Hours(1).range_after(last, 0).unwrap().is_empty());
    }

    #[test]
    fn floor_anchors_bins() {
        let origin = dt(2020, 1, 1, 5);
        assert_eq!(Frequency::Days(1).floor(dt(2020, 1, 3, 23), origin), dt(2020, 1, 3, 0));
        assert_eq!(Frequency::Hours(6).floor(dt(2020, 1, 1, 11), origin), dt(2020, 1, 1, 6));
        assert_eq!(
            Frequency::MonthStart(1).floor(dt(2020, 3, 17, 4), origin),
            dt(2020, 3, 1, 0)
        );
        assert_eq!(
            Frequency::MonthStart(3).floor(dt(2020, 5, 2, 0), origin),
            dt(2020, 4, 1, 0)
        );
    }

    #[test]
    fn infers_regular_indexes() {
        let hourly: Vec<_> = (0..5).map(|h| dt(2020, 1, 1, h)).collect();
        assert_eq!(Frequency::infer(&hourly), Some(Frequency::Hours(1)));

        let daily: Vec<_> = (1..6).map(|d| dt(2020, 1, d, 0)).collect();
        assert_eq!(Frequency::infer(&daily), Some(Frequency::Days(1)));

        let monthly: Vec<_> = (1..6).map(|m| dt(2020, m, 1, 0)).collect();
        assert_eq!(Frequency::infer(&monthly), Some(Frequency::MonthStart(1)));

        let irregular = vec![dt(2020, 1, 1, 0), dt(2020, 1, 2, 0), dt(2020, 1, 4, 0)];
        assert_eq!(Frequency::infer(&irregular), None);
    }
}
