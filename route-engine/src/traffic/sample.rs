//! Traffic samples and their decay toward free flow.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::time::minutes_between;
use crate::domain::{EdgeId, TimeBucket};

/// Errors for rejected traffic feed input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrafficError {
    /// Multiplier is negative or not a number
    #[error("invalid congestion multiplier {value} for edge {edge}")]
    InvalidMultiplier { edge: EdgeId, value: f64 },

    /// Confidence is outside [0, 1] or not a number
    #[error("invalid confidence {value} for edge {edge}")]
    InvalidConfidence { edge: EdgeId, value: f64 },
}

/// One congestion observation for an edge in a time bucket.
///
/// # Invariants
///
/// - `multiplier >= 1.0` (inputs in `[0, 1)` are raised to 1.0)
/// - `confidence` is in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSample {
    edge: EdgeId,
    bucket: TimeBucket,
    multiplier: f64,
    confidence: f64,
    observed_at: DateTime<Utc>,
}

impl TrafficSample {
    /// Create a fully-trusted sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_engine::domain::{EdgeId, TimeBucket};
    /// use route_engine::traffic::TrafficSample;
    /// use chrono::Utc;
    ///
    /// let now = Utc::now();
    /// let s = TrafficSample::new(EdgeId(1), TimeBucket(32), 0.5, now).unwrap();
    /// // Traffic never makes travel faster than free flow
    /// assert_eq!(s.multiplier(), 1.0);
    ///
    /// assert!(TrafficSample::new(EdgeId(1), TimeBucket(32), -2.0, now).is_err());
    /// ```
    pub fn new(
        edge: EdgeId,
        bucket: TimeBucket,
        multiplier: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, TrafficError> {
        if multiplier.is_nan() || multiplier < 0.0 || multiplier.is_infinite() {
            return Err(TrafficError::InvalidMultiplier {
                edge,
                value: multiplier,
            });
        }
        Ok(Self {
            edge,
            bucket,
            multiplier: multiplier.max(1.0),
            confidence: 1.0,
            observed_at,
        })
    }

    /// Attach a confidence in `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f64) -> Result<Self, TrafficError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(TrafficError::InvalidConfidence {
                edge: self.edge,
                value: confidence,
            });
        }
        self.confidence = confidence;
        Ok(self)
    }

    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    pub fn bucket(&self) -> TimeBucket {
        self.bucket
    }

    /// Multiplier as reported.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Multiplier in effect at `as_of`.
    ///
    /// Confidence scales the slowdown above 1.0. While the sample is younger
    /// than `staleness_mins` it applies in full; after that the slowdown
    /// halves every further `staleness_mins`. A window of zero means samples
    /// are stale on arrival.
    pub fn effective_multiplier(&self, as_of: DateTime<Utc>, staleness_mins: f64) -> f64 {
        if staleness_mins <= 0.0 {
            return 1.0;
        }
        let excess = (self.multiplier - 1.0) * self.confidence;
        let age = minutes_between(self.observed_at, as_of).max(0.0);
        if age <= staleness_mins {
            return 1.0 + excess;
        }
        let half_lives = (age - staleness_mins) / staleness_mins;
        1.0 + excess * 0.5_f64.powf(half_lives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap()
    }

    fn sample(m: f64) -> TrafficSample {
        TrafficSample::new(EdgeId(1), TimeBucket(32), m, t0()).unwrap()
    }

    #[test]
    fn clamps_below_one() {
        assert_eq!(sample(0.0).multiplier(), 1.0);
        assert_eq!(sample(0.99).multiplier(), 1.0);
        assert_eq!(sample(2.5).multiplier(), 2.5);
    }

    #[test]
    fn rejects_malformed() {
        for bad in [-0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                TrafficSample::new(EdgeId(1), TimeBucket(0), bad, t0()),
                Err(TrafficError::InvalidMultiplier { .. })
            ));
        }
        assert!(sample(2.0).with_confidence(1.5).is_err());
        assert!(sample(2.0).with_confidence(f64::NAN).is_err());
    }

    #[test]
    fn fresh_sample_applies_in_full() {
        let s = sample(3.0);
        assert_eq!(s.effective_multiplier(t0(), 30.0), 3.0);
        assert_eq!(s.effective_multiplier(t0() + Duration::minutes(30), 30.0), 3.0);
    }

    #[test]
    fn stale_sample_decays_toward_one() {
        let s = sample(3.0);
        // One window past staleness: excess of 2.0 halves to 1.0
        assert_eq!(s.effective_multiplier(t0() + Duration::minutes(60), 30.0), 2.0);
        assert_eq!(s.effective_multiplier(t0() + Duration::minutes(90), 30.0), 1.5);

        let far = s.effective_multiplier(t0() + Duration::hours(24), 30.0);
        assert!(far >= 1.0 && far < 1.0001);
    }

    #[test]
    fn zero_window_is_free_flow() {
        let s = sample(3.0);
        assert_eq!(s.effective_multiplier(t0(), 0.0), 1.0);
        assert_eq!(s.effective_multiplier(t0() + Duration::hours(5), 0.0), 1.0);
    }

    #[test]
    fn confidence_scales_excess() {
        let s = sample(3.0).with_confidence(0.5).unwrap();
        assert_eq!(s.effective_multiplier(t0(), 30.0), 2.0);

        let s = sample(3.0).with_confidence(0.0).unwrap();
        assert_eq!(s.effective_multiplier(t0(), 30.0), 1.0);
    }

    #[test]
    fn future_observation_counts_as_fresh() {
        let s = sample(2.0);
        assert_eq!(s.effective_multiplier(t0() - Duration::minutes(5), 30.0), 2.0);
    }
}
