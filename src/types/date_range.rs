//! Inclusive calendar-day ranges used to scope collection and integration runs.

use chrono::{Duration, NaiveDate};
use thiserror::Error;

/// Raised when a range's end date precedes its start date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date range: end {end} precedes start {start}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// An inclusive range of calendar days.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use distrito::DateRange;
///
/// let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
/// let range = DateRange::new(start, end).unwrap();
///
/// assert_eq!(range.num_days(), 3);
/// assert_eq!(range.iter_days().count(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range covering `start..=end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidDateRange> {
        if end < start {
            return Err(InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single day.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range, inclusive of both endpoints.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `day` falls inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Iterates every day in the range in ascending order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.num_days()).map(move |offset| start + Duration::days(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn iterates_inclusive_days() {
        let range = DateRange::new(date(2024, 1, 30), date(2024, 2, 2)).unwrap();
        let days: Vec<NaiveDate> = range.iter_days().collect();
        assert_eq!(
            days,
            vec![
                date(2024, 1, 30),
                date(2024, 1, 31),
                date(2024, 2, 1),
                date(2024, 2, 2),
            ]
        );
    }

    #[test]
    fn rejects_inverted_ranges() {
        assert!(DateRange::new(date(2024, 2, 2), date(2024, 2, 1)).is_err());
    }

    #[test]
    fn single_day_range_has_one_day() {
        let range = DateRange::single(date(2024, 6, 15));
        assert_eq!(range.num_days(), 1);
        assert!(range.contains(date(2024, 6, 15)));
        assert!(!range.contains(date(2024, 6, 16)));
    }
}
