//! Date range validation for weather requests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wxlog_core::ValidationError;

/// Longest allowed distance between start and end date, in whole days.
pub const MAX_RANGE_DAYS: i64 = 31;

/// An inclusive, validated calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Whole days between start and end (0 for a single-day range).
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Parse a strict `YYYY-MM-DD` string into a calendar date.
///
/// Rejects anything that is not exactly four digits, dash, two digits, dash,
/// two digits, as well as impossible dates such as `2024-02-30`.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 {
        return None;
    }

    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Validate a `(start, end)` pair.
///
/// Checks run in order: format of both dates, ordering, then maximum span.
pub fn validate_date_range(start: &str, end: &str) -> Result<DateRange, ValidationError> {
    let (Some(start), Some(end)) = (parse_iso_date(start), parse_iso_date(end)) else {
        return Err(ValidationError::InvalidFormat);
    };

    if start > end {
        return Err(ValidationError::OrderingError);
    }

    let range = DateRange { start, end };
    if range.span_days() > MAX_RANGE_DAYS {
        return Err(ValidationError::RangeTooLarge {
            max_days: MAX_RANGE_DAYS,
        });
    }

    Ok(range)
}
