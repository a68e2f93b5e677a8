//! Traveller preference weights.

use serde::{Deserialize, Serialize};

use super::{Criteria, Criterion, DomainError};

/// Per-request weights over duration, fare and transfers.
///
/// Used to order the search frontier and to rank the final Pareto set.
/// Never stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub duration_weight: f64,
    pub fare_weight: f64,
    pub transfer_weight: f64,
}

impl PreferenceProfile {
    /// Create a profile from raw weights.
    pub fn new(duration_weight: f64, fare_weight: f64, transfer_weight: f64) -> Self {
        Self {
            duration_weight,
            fare_weight,
            transfer_weight,
        }
    }

    /// Only duration matters.
    pub fn fastest() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Only fare matters.
    pub fn cheapest() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// Only the number of transfers matters.
    pub fn fewest_transfers() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// Equal weight on every criterion.
    pub fn balanced() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Check weights are finite, non-negative and not all zero.
    pub fn validate(&self) -> Result<(), DomainError> {
        let weights = [self.duration_weight, self.fare_weight, self.transfer_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DomainError::InvalidPreference(
                "weights must be finite and non-negative",
            ));
        }
        if weights.iter().all(|w| *w == 0.0) {
            return Err(DomainError::InvalidPreference(
                "at least one weight must be positive",
            ));
        }
        Ok(())
    }

    /// The criterion with the largest weight.
    ///
    /// Ties resolve in the order duration, fare, transfers.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_engine::domain::{Criterion, PreferenceProfile};
    ///
    /// assert_eq!(PreferenceProfile::cheapest().primary(), Criterion::Fare);
    /// assert_eq!(PreferenceProfile::balanced().primary(), Criterion::Duration);
    /// ```
    pub fn primary(&self) -> Criterion {
        let mut best = (Criterion::Duration, self.duration_weight);
        if self.fare_weight > best.1 {
            best = (Criterion::Fare, self.fare_weight);
        }
        if self.transfer_weight > best.1 {
            best = (Criterion::Transfers, self.transfer_weight);
        }
        best.0
    }

    /// Weighted sum of raw (unnormalised) criteria.
    pub fn weighted(&self, criteria: &Criteria) -> f64 {
        self.duration_weight * criteria.duration_mins
            + self.fare_weight * criteria.fare
            + self.transfer_weight * f64::from(criteria.transfers)
    }
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self::fastest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for p in [
            PreferenceProfile::fastest(),
            PreferenceProfile::cheapest(),
            PreferenceProfile::fewest_transfers(),
            PreferenceProfile::balanced(),
        ] {
            assert!(p.validate().is_ok());
        }
    }

    #[test]
    fn reject_negative_and_nan() {
        assert!(PreferenceProfile::new(-1.0, 1.0, 0.0).validate().is_err());
        assert!(PreferenceProfile::new(f64::NAN, 1.0, 0.0).validate().is_err());
        assert!(PreferenceProfile::new(f64::INFINITY, 0.0, 0.0).validate().is_err());
    }

    #[test]
    fn reject_all_zero() {
        let err = PreferenceProfile::new(0.0, 0.0, 0.0).validate().unwrap_err();
        assert!(err.to_string().contains("at least one weight"));
    }

    #[test]
    fn primary_picks_largest_weight() {
        assert_eq!(
            PreferenceProfile::new(0.2, 0.3, 0.5).primary(),
            Criterion::Transfers
        );
        assert_eq!(
            PreferenceProfile::new(0.5, 0.5, 0.0).primary(),
            Criterion::Duration
        );
    }

    #[test]
    fn weighted_sum() {
        let p = PreferenceProfile::new(1.0, 2.0, 10.0);
        let c = Criteria::new(15.0, 1.0, 1);
        assert_eq!(p.weighted(&c), 15.0 + 2.0 + 10.0);
    }
}
