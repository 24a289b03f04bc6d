//! Monthly accounting periods.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A calendar month, the unit every closure and expansion is keyed by.
///
/// Field order matters: the derived `Ord` compares the year first, so periods
/// sort chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> ResultEngine<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidPeriod(format!(
                "month must be within 1..=12, got {month}"
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::InvalidPeriod(format!(
                "year {year} is out of range"
            )));
        }
        Ok(Self { year, month })
    }

    /// The period a date falls in.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    pub fn first_day(self) -> ResultEngine<NaiveDate> {
        self.day(1)
    }

    pub fn last_day(self) -> ResultEngine<NaiveDate> {
        let next_first = self.next()?.first_day()?;
        next_first
            .pred_opt()
            .ok_or_else(|| EngineError::InvalidPeriod(format!("{self} has no last day")))
    }

    /// Number of days in the month.
    pub fn len_days(self) -> ResultEngine<u32> {
        Ok(self.last_day()?.day())
    }

    /// The date for `day` in this period, clamped to the last day of the month
    /// (so day 31 becomes Feb 28/29).
    pub fn clamped_day(self, day: u32) -> ResultEngine<NaiveDate> {
        let last = self.len_days()?;
        self.day(day.clamp(1, last))
    }

    pub fn next(self) -> ResultEngine<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    pub fn prev(self) -> ResultEngine<Self> {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        Self::containing(date) == self
    }

    fn day(self, day: u32) -> ResultEngine<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
            .ok_or_else(|| EngineError::InvalidPeriod(format!("{self} has no day {day}")))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = EngineError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidPeriod(format!("expected YYYY-MM, got {s:?}"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_and_displays() {
        let period: Period = "2025-02".parse().unwrap();
        assert_eq!(period.year(), 2025);
        assert_eq!(period.month(), 2);
        assert_eq!(period.to_string(), "2025-02");
        assert!("2025-13".parse::<Period>().is_err());
        assert!("2025".parse::<Period>().is_err());
    }

    #[test]
    fn month_bounds_handle_leap_years() {
        let feb = Period::new(2024, 2).unwrap();
        assert_eq!(feb.first_day().unwrap(), date(2024, 2, 1));
        assert_eq!(feb.last_day().unwrap(), date(2024, 2, 29));
        assert_eq!(feb.clamped_day(31).unwrap(), date(2024, 2, 29));
        assert_eq!(
            Period::new(2025, 2).unwrap().clamped_day(30).unwrap(),
            date(2025, 2, 28)
        );
    }

    #[test]
    fn next_and_prev_cross_year_boundaries() {
        let dec = Period::new(2024, 12).unwrap();
        assert_eq!(dec.next().unwrap(), Period::new(2025, 1).unwrap());
        assert_eq!(dec.next().unwrap().prev().unwrap(), dec);
        assert_eq!(dec.last_day().unwrap(), date(2024, 12, 31));
    }

    #[test]
    fn ordering_is_chronological() {
        let a = Period::new(2024, 12).unwrap();
        let b = Period::new(2025, 1).unwrap();
        assert!(a < b);
        assert!(b.contains(date(2025, 1, 31)));
        assert!(!b.contains(date(2025, 2, 1)));
    }
}
