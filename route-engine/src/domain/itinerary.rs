//! Itinerary types.
//!
//! An `Itinerary` is the value produced by one search run: an ordered walk
//! through the graph, each leg annotated with the cost realised under the
//! traffic snapshot the search used. Itineraries are never mutated after
//! construction.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::time::add_minutes;
use super::{Criteria, DomainError, EdgeId, Mode, NodeId};

/// One traversed edge of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    /// Edge travelled
    pub edge: EdgeId,
    /// Node the edge leaves from
    pub from: NodeId,
    /// Node the edge arrives at
    pub to: NodeId,
    /// Mode of the edge
    pub mode: Mode,
    /// When travel on the edge starts (after any wait)
    pub departure: DateTime<Utc>,
    /// Minutes spent waiting for a scheduled departure
    pub wait_mins: f64,
    /// Minutes spent moving, traffic included
    pub travel_mins: f64,
    /// Fare charged for the edge
    pub fare: f64,
    /// Whether boarding this edge changed mode
    pub transfer: bool,
}

impl Leg {
    /// Total minutes this leg contributes (wait plus travel).
    pub fn total_mins(&self) -> f64 {
        self.wait_mins + self.travel_mins
    }

    /// Arrival time at `to`, saturating at the latest representable
    /// instant.
    pub fn arrival(&self) -> DateTime<Utc> {
        add_minutes(self.departure, self.travel_mins).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Cost vector of this leg alone.
    pub fn criteria(&self) -> Criteria {
        Criteria::new(self.total_mins(), self.fare, u32::from(self.transfer))
    }
}

/// A complete journey from origin to destination.
///
/// # Invariants
///
/// - The first leg departs from `origin`
/// - Consecutive legs connect (`legs[i].to == legs[i + 1].from`)
/// - `totals` is the sum of the legs' criteria
///
/// A zero-leg itinerary is valid and represents origin == destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Itinerary {
    origin: NodeId,
    destination: NodeId,
    departure: DateTime<Utc>,
    legs: Vec<Leg>,
    totals: Criteria,
}

impl Itinerary {
    /// Constructs an itinerary from legs in travel order.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the first leg does not leave `origin` or if two
    /// consecutive legs do not share a node.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_engine::domain::{EdgeId, Itinerary, Leg, Mode, NodeId};
    /// use chrono::{TimeZone, Utc};
    ///
    /// let depart = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
    /// let leg = Leg {
    ///     edge: EdgeId(1),
    ///     from: NodeId(0),
    ///     to: NodeId(1),
    ///     mode: Mode::Walk,
    ///     departure: depart,
    ///     wait_mins: 0.0,
    ///     travel_mins: 10.0,
    ///     fare: 0.0,
    ///     transfer: false,
    /// };
    ///
    /// let itinerary = Itinerary::new(NodeId(0), depart, vec![leg]).unwrap();
    /// assert_eq!(itinerary.destination(), NodeId(1));
    /// assert_eq!(itinerary.total_duration_mins(), 10.0);
    /// ```
    pub fn new(
        origin: NodeId,
        departure: DateTime<Utc>,
        legs: Vec<Leg>,
    ) -> Result<Self, DomainError> {
        if let Some(first) = legs.first()
            && first.from != origin
        {
            return Err(DomainError::OriginMismatch {
                expected: origin,
                found: first.from,
            });
        }

        for window in legs.windows(2) {
            if window[0].to != window[1].from {
                return Err(DomainError::NotContiguous(window[0].to, window[1].from));
            }
        }

        let totals = legs
            .iter()
            .fold(Criteria::ZERO, |acc, leg| acc + leg.criteria());
        let destination = legs.last().map(|leg| leg.to).unwrap_or(origin);

        Ok(Itinerary {
            origin,
            destination,
            departure,
            legs,
            totals,
        })
    }

    /// The zero-length itinerary for origin == destination.
    pub fn stay(origin: NodeId, departure: DateTime<Utc>) -> Self {
        Itinerary {
            origin,
            destination: origin,
            departure,
            legs: Vec::new(),
            totals: Criteria::ZERO,
        }
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Requested departure from the origin.
    pub fn departure_time(&self) -> DateTime<Utc> {
        self.departure
    }

    /// Arrival at the destination.
    pub fn arrival_time(&self) -> DateTime<Utc> {
        add_minutes(self.departure, self.totals.duration_mins).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// All legs in order.
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Number of edges traversed.
    pub fn edge_count(&self) -> usize {
        self.legs.len()
    }

    /// True for the zero-length itinerary.
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Edge ids in travel order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.legs.iter().map(|leg| leg.edge)
    }

    /// Accumulated (duration, fare, transfers).
    pub fn criteria(&self) -> Criteria {
        self.totals
    }

    pub fn total_duration_mins(&self) -> f64 {
        self.totals.duration_mins
    }

    pub fn total_fare(&self) -> f64 {
        self.totals.fare
    }

    pub fn transfer_count(&self) -> u32 {
        self.totals.transfers
    }

    /// Modes used, in order, with consecutive repeats collapsed.
    pub fn modes(&self) -> Vec<Mode> {
        let mut modes: Vec<Mode> = self.legs.iter().map(|leg| leg.mode).collect();
        modes.dedup();
        modes
    }

    /// True if `self` dominates `other` on (duration, fare, transfers).
    pub fn dominates(&self, other: &Itinerary) -> bool {
        self.totals.dominates(&other.totals)
    }
}
