//! Calendar/clock values used to index rainfall snapshots.
//!
//! A [`TimePoint`] is deliberately simpler than a full calendar type: it
//! carries seconds into minutes and hours, but a day overflow is a raw
//! increment of the day field and never rolls into the month or year. The
//! rainfall cache keys are derived from this arithmetic, so changing it
//! changes which snapshot a request reads.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

/// Largest day value representable in the two-digit key field.
const MAX_DAY: u32 = 99;

/// Largest year representable in the four-digit key field.
const MAX_YEAR: i32 = 9999;

/// Error returned when constructing or parsing an invalid time point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A normalized calendar/clock value with a canonical 12-digit key.
///
/// # Examples
///
/// ```
/// use rain_router::domain::TimePoint;
///
/// let t = TimePoint::at(2024, 1, 15, 13, 45).unwrap();
/// assert_eq!(t.key(), "202401151345");
///
/// let later = t.advance(30 * 60).unwrap();
/// assert_eq!(later.key(), "202401151415");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimePoint {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

impl TimePoint {
    /// Create a time point, validating every field range.
    ///
    /// The day is only checked against the key width, not the month length:
    /// [`TimePoint::advance`] can legitimately produce e.g. January 32nd.
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<Self, TimeError> {
        if !(0..=MAX_YEAR).contains(&year) {
            return Err(TimeError::new("year must be 0-9999"));
        }
        if !(1..=12).contains(&month) {
            return Err(TimeError::new("month must be 1-12"));
        }
        if !(1..=MAX_DAY).contains(&day) {
            return Err(TimeError::new("day must be 1-99"));
        }
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }
        if second > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Shorthand for [`TimePoint::new`] with `second = 0`.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Result<Self, TimeError> {
        Self::new(year, month, day, hour, minute, 0)
    }

    /// Convert from a chrono datetime (sub-second precision is dropped).
    pub fn from_datetime(dt: NaiveDateTime) -> Result<Self, TimeError> {
        Self::new(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }

    /// The current local wall-clock time.
    pub fn now() -> Result<Self, TimeError> {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    /// Add `delta_seconds` (which may be negative).
    ///
    /// Seconds carry into minutes, minutes into hours, hours into the day.
    /// The day is incremented as a raw number: crossing the end of a month
    /// yields e.g. day 32 rather than the 1st of the next month.
    ///
    /// Fails if the day would leave `1..=99`.
    ///
    /// ```
    /// use rain_router::domain::TimePoint;
    ///
    /// let t = TimePoint::at(2024, 1, 31, 23, 59).unwrap();
    /// let next = t.advance(60).unwrap();
    /// assert_eq!((next.month(), next.day(), next.hour()), (1, 32, 0));
    /// ```
    pub fn advance(&self, delta_seconds: i64) -> Result<Self, TimeError> {
        let total = i64::from(self.second)
            .checked_add(delta_seconds)
            .ok_or_else(|| TimeError::new("advance overflows"))?;
        let second = total.rem_euclid(60);
        let carry = total.div_euclid(60);

        let total = i64::from(self.minute) + carry;
        let minute = total.rem_euclid(60);
        let carry = total.div_euclid(60);

        let total = i64::from(self.hour) + carry;
        let hour = total.rem_euclid(24);
        let carry = total.div_euclid(24);

        let day = i64::from(self.day) + carry;
        if !(1..=i64::from(MAX_DAY)).contains(&day) {
            return Err(TimeError::new("day out of range after advance"));
        }

        // All casts below are bounded by the rem_euclid/range checks above.
        Ok(Self {
            year: self.year,
            month: self.month,
            day: day as u32,
            hour: hour as u32,
            minute: minute as u32,
            second: second as u32,
        })
    }

    /// Round down to the start of a `bucket_mins`-minute bucket.
    ///
    /// Buckets of 0 or 1 minute leave the value unchanged.
    pub fn floor_to(&self, bucket_mins: u32) -> Self {
        if bucket_mins <= 1 {
            return *self;
        }
        let bucket = bucket_mins.min(60);
        Self {
            minute: self.minute - self.minute % bucket,
            second: 0,
            ..*self
        }
    }

    /// The canonical `YYYYMMDDHHMM` key. Seconds are not represented.
    pub fn key(&self) -> String {
        format!(
            "{:04}{:02}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }

    /// Parse a 12-digit `YYYYMMDDHHMM` key.
    pub fn parse_key(s: &str) -> Result<Self, TimeError> {
        if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeError::new("expected 12 digits YYYYMMDDHHMM"));
        }
        // Every byte is an ASCII digit, so slicing and parsing cannot fail.
        let field = |range: std::ops::Range<usize>| s[range].parse::<u32>().unwrap_or(0);

        Self::at(
            field(0..4) as i32,
            field(4..6),
            field(6..8),
            field(8..10),
            field(10..12),
        )
    }
}

/// Accepted ISO-8601-ish layouts besides the 12-digit key.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

impl FromStr for TimePoint {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 12 && s.bytes().all(|b| b.is_ascii_digit()) {
            return Self::parse_key(s);
        }

        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .ok_or_else(|| TimeError::new("expected YYYYMMDDHHMM or YYYY-MM-DDTHH:MM[:SS]"))
            .and_then(Self::from_datetime)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Time points where an hour either way never crosses midnight.
    fn arb_morning() -> impl Strategy<Value = TimePoint> {
        (2000i32..2100, 1u32..=12, 1u32..=28, 1u32..22, 0u32..60, 0u32..60)
            .prop_map(|(y, mo, d, h, mi, s)| TimePoint::new(y, mo, d, h, mi, s).unwrap())
    }

    proptest! {
        #[test]
        fn advance_is_additive_within_a_day(t in arb_morning()) {
            let twice = t.advance(3600).unwrap().advance(3600).unwrap();
            prop_assert_eq!(twice, t.advance(7200).unwrap());
        }

        #[test]
        fn advance_and_back_is_identity(t in arb_morning(), delta in -3600i64..3600) {
            let there = t.advance(delta).unwrap();
            prop_assert_eq!(there.advance(-delta).unwrap(), t);
        }

        #[test]
        fn key_is_twelve_digits(t in arb_morning()) {
            let key = t.key();
            prop_assert_eq!(key.len(), 12);
            prop_assert!(key.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
