//! Departure schedules for edges that can only be boarded at fixed times.
//!
//! Schedules are expressed in minutes after midnight and do not wrap past
//! the end of the service day: once the last departure has gone the edge
//! cannot be boarded again that day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::time::{MINUTES_PER_DAY, minute_of_day};

/// When an edge may be boarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Explicit departure minutes (sorted and deduplicated at load).
    Fixed { departures: Vec<u32> },
    /// A departure every `every` minutes from `first` to `last` inclusive.
    Headway { first: u32, last: u32, every: u32 },
}

impl Schedule {
    /// Check the schedule is well formed.
    pub fn validate(&self) -> Result<(), &'static str> {
        match self {
            Schedule::Fixed { departures } => {
                if departures.is_empty() {
                    return Err("fixed schedule has no departures");
                }
                if departures.iter().any(|m| *m >= MINUTES_PER_DAY) {
                    return Err("departure minute outside the day");
                }
            }
            Schedule::Headway { first, last, every } => {
                if *every == 0 {
                    return Err("headway must be positive");
                }
                if first > last {
                    return Err("first departure after last departure");
                }
                if *last >= MINUTES_PER_DAY {
                    return Err("departure minute outside the day");
                }
            }
        }
        Ok(())
    }

    /// Sort and deduplicate fixed departures.
    pub(crate) fn normalise(mut self) -> Self {
        if let Schedule::Fixed { departures } = &mut self {
            departures.sort_unstable();
            departures.dedup();
        }
        self
    }

    /// Minutes to wait at `at` for the next departure.
    ///
    /// Returns `None` if no departure remains in the service day.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_engine::graph::Schedule;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let every_ten = Schedule::Headway { first: 360, last: 1320, every: 10 };
    /// let at = Utc.with_ymd_and_hms(2024, 3, 15, 8, 3, 0).unwrap();
    /// assert_eq!(every_ten.wait_mins(at), Some(7.0));
    /// ```
    pub fn wait_mins(&self, at: DateTime<Utc>) -> Option<f64> {
        let now = minute_of_day(at);
        match self {
            Schedule::Fixed { departures } => departures
                .iter()
                .map(|d| f64::from(*d))
                .find(|d| *d >= now)
                .map(|d| d - now),
            Schedule::Headway { first, last, every } => {
                let first = f64::from(*first);
                let last = f64::from(*last);
                let every = f64::from(*every);
                if now <= first {
                    return Some(first - now);
                }
                let next = first + ((now - first) / every).ceil() * every;
                (next <= last).then_some(next - now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, s).unwrap()
    }

    #[test]
    fn fixed_waits_for_next() {
        let s = Schedule::Fixed {
            departures: vec![480, 500, 540],
        };
        assert_eq!(s.wait_mins(at(8, 0, 0)), Some(0.0));
        assert_eq!(s.wait_mins(at(8, 1, 0)), Some(19.0));
        assert_eq!(s.wait_mins(at(8, 20, 30)), Some(39.5));
        assert_eq!(s.wait_mins(at(9, 1, 0)), None);
    }

    #[test]
    fn headway_before_first() {
        let s = Schedule::Headway {
            first: 360,
            last: 600,
            every: 15,
        };
        assert_eq!(s.wait_mins(at(5, 50, 0)), Some(10.0));
    }

    #[test]
    fn headway_on_departure_is_zero_wait() {
        let s = Schedule::Headway {
            first: 360,
            last: 600,
            every: 15,
        };
        assert_eq!(s.wait_mins(at(6, 30, 0)), Some(0.0));
        assert_eq!(s.wait_mins(at(6, 31, 0)), Some(14.0));
    }

    #[test]
    fn headway_after_last() {
        let s = Schedule::Headway {
            first: 360,
            last: 600,
            every: 15,
        };
        assert_eq!(s.wait_mins(at(10, 0, 0)), Some(0.0));
        assert_eq!(s.wait_mins(at(10, 0, 1)), None);
    }

    #[test]
    fn validation() {
        assert!(Schedule::Fixed { departures: vec![] }.validate().is_err());
        assert!(
            Schedule::Fixed {
                departures: vec![1440]
            }
            .validate()
            .is_err()
        );
        assert!(
            Schedule::Headway {
                first: 10,
                last: 5,
                every: 5
            }
            .validate()
            .is_err()
        );
        assert!(
            Schedule::Headway {
                first: 0,
                last: 100,
                every: 0
            }
            .validate()
            .is_err()
        );
        assert!(
            Schedule::Headway {
                first: 0,
                last: 1439,
                every: 30
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn normalise_sorts_fixed() {
        let s = Schedule::Fixed {
            departures: vec![500, 480, 500],
        }
        .normalise();
        assert_eq!(
            s,
            Schedule::Fixed {
                departures: vec![480, 500]
            }
        );
    }

    #[test]
    fn serde_tagged() {
        let s: Schedule =
            serde_json::from_str(r#"{"kind":"headway","first":360,"last":600,"every":15}"#)
                .unwrap();
        assert_eq!(
            s,
            Schedule::Headway {
                first: 360,
                last: 600,
                every: 15
            }
        );
    }
}
