//! The three optimisation criteria and dominance between them.

use std::ops::Add;

use serde::{Deserialize, Serialize};

/// One of the compared dimensions of a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Duration,
    Fare,
    Transfers,
}

/// Accumulated cost of a (partial) journey.
///
/// Durations are minutes, fares are in the network's currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Criteria {
    pub duration_mins: f64,
    pub fare: f64,
    pub transfers: u32,
}

impl Criteria {
    /// The cost of not travelling at all.
    pub const ZERO: Criteria = Criteria {
        duration_mins: 0.0,
        fare: 0.0,
        transfers: 0,
    };

    /// Create a cost vector.
    pub fn new(duration_mins: f64, fare: f64, transfers: u32) -> Self {
        Self {
            duration_mins,
            fare,
            transfers,
        }
    }

    /// Value of a single criterion as a float.
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Duration => self.duration_mins,
            Criterion::Fare => self.fare,
            Criterion::Transfers => f64::from(self.transfers),
        }
    }

    /// True if `self` is no worse than `other` in every criterion.
    ///
    /// Equal vectors cover each other.
    pub fn covers(&self, other: &Criteria) -> bool {
        self.duration_mins <= other.duration_mins
            && self.fare <= other.fare
            && self.transfers <= other.transfers
    }

    /// True if `self` dominates `other`: no worse anywhere and strictly
    /// better in at least one criterion.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_engine::domain::Criteria;
    ///
    /// let fast = Criteria::new(8.0, 3.0, 0);
    /// let slow = Criteria::new(15.0, 3.0, 1);
    /// let cheap = Criteria::new(15.0, 1.0, 1);
    ///
    /// assert!(fast.dominates(&slow));
    /// assert!(!fast.dominates(&cheap));
    /// assert!(!fast.dominates(&fast));
    /// ```
    pub fn dominates(&self, other: &Criteria) -> bool {
        self.covers(other)
            && (self.duration_mins < other.duration_mins
                || self.fare < other.fare
                || self.transfers < other.transfers)
    }
}

impl Add for Criteria {
    type Output = Criteria;

    fn add(self, rhs: Criteria) -> Criteria {
        Criteria {
            duration_mins: self.duration_mins + rhs.duration_mins,
            fare: self.fare + rhs.fare,
            transfers: self.transfers + rhs.transfers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_is_weak() {
        let a = Criteria::new(10.0, 1.0, 1);
        assert!(a.covers(&a));
        assert!(!a.dominates(&a));
    }

    #[test]
    fn dominance_needs_strict_improvement() {
        let a = Criteria::new(10.0, 1.0, 1);
        let b = Criteria::new(10.0, 1.0, 2);
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn incomparable_vectors() {
        let a = Criteria::new(8.0, 3.0, 0);
        let b = Criteria::new(15.0, 1.0, 1);
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn add_accumulates() {
        let total = Criteria::new(10.0, 0.0, 0) + Criteria::new(5.0, 1.0, 1);
        assert_eq!(total, Criteria::new(15.0, 1.0, 1));
    }

    #[test]
    fn get_by_criterion() {
        let c = Criteria::new(12.5, 2.0, 3);
        assert_eq!(c.get(Criterion::Duration), 12.5);
        assert_eq!(c.get(Criterion::Fare), 2.0);
        assert_eq!(c.get(Criterion::Transfers), 3.0);
    }
}
