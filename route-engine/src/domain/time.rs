//! Time-of-day helpers for traffic buckets and schedules.
//!
//! Traffic conditions repeat daily, so samples are keyed by a bucket of the
//! day rather than an absolute timestamp. Schedules are likewise expressed in
//! minutes after midnight (UTC).

use std::fmt;

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Minutes in one day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A window of the day, `bucket_mins` wide, counted from midnight.
///
/// # Examples
///
/// ```
/// use route_engine::domain::TimeBucket;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 15, 10, 20, 0).unwrap();
/// // 10:20 is 620 minutes after midnight; with 15-minute buckets that is bucket 41.
/// assert_eq!(TimeBucket::of(at, 15), TimeBucket(41));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeBucket(pub u32);

impl TimeBucket {
    /// Bucket containing the given instant.
    ///
    /// A `bucket_mins` of zero is treated as one minute.
    pub fn of(at: DateTime<Utc>, bucket_mins: u32) -> Self {
        let minute = at.hour() * 60 + at.minute();
        TimeBucket(minute / bucket_mins.max(1))
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bucket {}", self.0)
    }
}

/// Fractional minutes elapsed since midnight.
pub fn minute_of_day(at: DateTime<Utc>) -> f64 {
    f64::from(at.num_seconds_from_midnight()) / 60.0
}

/// Advance an instant by a fractional number of minutes.
///
/// Rounded to whole milliseconds so repeated evaluation is exact. `None`
/// when `minutes` is not finite or the result leaves chrono's range.
pub fn add_minutes(at: DateTime<Utc>, minutes: f64) -> Option<DateTime<Utc>> {
    let millis = (minutes * 60_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    at.checked_add_signed(TimeDelta::try_milliseconds(millis as i64)?)
}

/// Fractional minutes from `earlier` to `later` (negative if reversed).
pub fn minutes_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    later.signed_duration_since(earlier).num_milliseconds() as f64 / 60_000.0
}
