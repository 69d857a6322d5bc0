//! Inclusive date ranges and calendar month keys used by reports and filters.

use std::fmt::Display;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::Error;

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// The first date in the range.
    pub start: Date,
    /// The last date in the range.
    pub end: Date,
}

impl DateRange {
    /// Create a date range covering `start` to `end`, both ends inclusive.
    ///
    /// # Errors
    /// Returns [Error::InvalidDateRange] if `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidDateRange(start, end));
        }

        Ok(Self { start, end })
    }
}

/// A calendar month, formatted as `YYYY-MM`.
///
/// Months are ordered by their ordinal `year * 12 + (month - 1)`, so
/// December of one year always sorts before January of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthKey {
    year: i32,
    month: Month,
}

impl MonthKey {
    /// The month that `date` falls in.
    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse a `YYYY-MM` string, as produced by SQLite's `strftime('%Y-%m', ...)`.
    pub fn parse(text: &str) -> Option<Self> {
        let (year, month) = text.split_once('-')?;
        let year = year.parse().ok()?;
        let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;

        Some(Self { year, month })
    }

    /// The numeric position of this month on a single time line.
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(u8::from(self.month)) - 1
    }

    /// The month `count` months before this one.
    pub fn months_before(&self, count: u32) -> Self {
        Self::from_ordinal(self.ordinal() - i64::from(count))
    }

    /// The month after this one.
    pub fn next(&self) -> Self {
        Self::from_ordinal(self.ordinal() + 1)
    }

    /// The first day of the month, or `None` if the year is outside the range of [Date].
    pub fn first_day(&self) -> Option<Date> {
        Date::from_calendar_date(self.year, self.month, 1).ok()
    }

    /// The last day of the month, or `None` if the year is outside the range of [Date].
    pub fn last_day(&self) -> Option<Date> {
        Date::from_calendar_date(self.year, self.month, self.month.length(self.year)).ok()
    }

    fn from_ordinal(ordinal: i64) -> Self {
        let year = ordinal.div_euclid(12);
        let month_index = ordinal.rem_euclid(12) as u8 + 1;

        Self {
            year: year as i32,
            month: Month::try_from(month_index).unwrap_or(Month::January),
        }
    }
}

impl PartialOrd for MonthKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MonthKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, u8::from(self.month))
    }
}

impl FromSql for MonthKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        Self::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("invalid month key \"{text}\"").into()))
    }
}

impl Serialize for MonthKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod date_range_tests {
    use time::macros::date;

    use crate::Error;

    use super::DateRange;

    #[test]
    fn new_accepts_single_day() {
        let range = DateRange::new(date!(2025 - 03 - 01), date!(2025 - 03 - 01));

        assert!(range.is_ok());
    }

    #[test]
    fn new_rejects_reversed_range() {
        let range = DateRange::new(date!(2025 - 03 - 02), date!(2025 - 03 - 01));

        assert_eq!(
            range,
            Err(Error::InvalidDateRange(
                date!(2025 - 03 - 02),
                date!(2025 - 03 - 01)
            ))
        );
    }

}
