//! Calendar-date value type shared across the engine.
//!
//! Itinerary math only ever cares about whole calendar days. `PlanDate`
//! carries explicit year/month/day fields, one total order, and day
//! arithmetic via civil day numbers, so there is no clock time or time
//! zone anywhere in the model. The textual form is `YYYY-MM-DD`; parsing
//! tolerates (and discards) a trailing `T…` time component coming from
//! upstream timestamp strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A plain calendar date. Field order gives the derived `Ord` the natural
/// chronological total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlanDate {
    year: i32,
    month: u8,
    day: u8,
}

/// Error returned when a date string cannot be read as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid calendar date: {0:?}")]
pub struct DateParseError(pub String);

impl PlanDate {
    /// Construct a date, rejecting out-of-range month/day combinations.
    #[must_use]
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        if month == 0 || month > 12 || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u8 {
        self.month
    }

    #[must_use]
    pub const fn day(self) -> u8 {
        self.day
    }

    /// Days since the civil epoch (1970-01-01). Negative before the epoch.
    #[must_use]
    pub const fn civil_days(self) -> i64 {
        days_from_civil(self.year, self.month, self.day)
    }

    /// The date `days` whole days later (earlier when negative).
    #[must_use]
    pub fn add_days(self, days: i64) -> Self {
        let (year, month, day) = civil_from_days(self.civil_days() + days);
        Self { year, month, day }
    }

    /// The next calendar day.
    #[must_use]
    pub fn succ(self) -> Self {
        self.add_days(1)
    }

    /// Signed whole days from `self` to `other`.
    #[must_use]
    pub const fn days_until(self, other: Self) -> i64 {
        other.civil_days() - self.civil_days()
    }

    /// Every date from `self` through `end`, inclusive. Empty when
    /// `end` precedes `self`.
    #[must_use]
    pub fn span_through(self, end: Self) -> Vec<Self> {
        let mut dates = Vec::new();
        let mut cursor = self;
        while cursor <= end {
            dates.push(cursor);
            cursor = cursor.succ();
        }
        dates
    }

    /// Short human-readable label, e.g. `"Jan 13"`.
    #[must_use]
    pub fn short_label(self) -> String {
        let month = MONTH_ABBREV[(self.month - 1) as usize];
        format!("{month} {}", self.day)
    }
}

impl fmt::Display for PlanDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for PlanDate {
    type Err = DateParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Upstream sources sometimes hand over full timestamps; the day is
        // everything before the 'T'.
        let calendar = value.split('T').next().unwrap_or(value).trim();
        let mut parts = calendar.splitn(3, '-');
        let parsed = (|| {
            let year = parts.next()?.parse::<i32>().ok()?;
            let month = parts.next()?.parse::<u8>().ok()?;
            let day = parts.next()?.parse::<u8>().ok()?;
            Self::new(year, month, day)
        })();
        parsed.ok_or_else(|| DateParseError(value.to_string()))
    }
}

impl Serialize for PlanDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PlanDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

const fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

const fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// Civil calendar <-> day number conversion (proleptic Gregorian).
const fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = year as i64 - if month <= 2 { 1 } else { 0 };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[allow(clippy::cast_possible_truncation)]
const fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let mut year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    if month <= 2 {
        year += 1;
    }
    (year as i32, month as u8, day as u8)
}
