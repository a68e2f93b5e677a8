//! Greedy multi-stop tours.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{Criteria, Itinerary, NodeId, PreferenceProfile};

use super::cancel::CancelFlag;
use super::search::{RouteError, RouteOptimizer, RouteQuery};

/// A visiting order over a set of stops, with the itinerary for each hop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tour {
    /// Stops in visiting order, starting with the start node.
    pub order: Vec<NodeId>,
    /// One itinerary per consecutive pair in `order`.
    pub hops: Vec<Itinerary>,
    /// Stops that could not be reached from the tour's last position.
    pub unreachable: Vec<NodeId>,
    pub totals: Criteria,
}

impl Tour {
    /// Arrival at the final stop.
    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        self.hops.last().map(Itinerary::arrival_time)
    }
}

/// Visit every stop, always travelling next to the stop that is cheapest
/// to reach under the preference.
///
/// Each hop departs when the previous one arrives. Ties go to the stop
/// listed first. Repeated stops and the start itself are visited once.
pub fn plan_tour(
    optimizer: &RouteOptimizer<'_>,
    start: NodeId,
    stops: &[NodeId],
    departure: DateTime<Utc>,
    preference: &PreferenceProfile,
    cancel: &CancelFlag,
) -> Result<Tour, RouteError> {
    let mut remaining: Vec<NodeId> = Vec::with_capacity(stops.len());
    for stop in stops {
        if *stop != start && !remaining.contains(stop) {
            remaining.push(*stop);
        }
    }

    let mut tour = Tour {
        order: vec![start],
        hops: Vec::new(),
        unreachable: Vec::new(),
        totals: Criteria::ZERO,
    };
    let mut current = start;
    let mut clock = departure;

    while !remaining.is_empty() {
        let mut best: Option<(usize, f64, Itinerary)> = None;
        for (i, stop) in remaining.iter().enumerate() {
            let query = RouteQuery::new(current, *stop, clock, *preference);
            let outcome = optimizer.search(&query, cancel)?;
            let Some(first) = outcome.itineraries.into_iter().next() else {
                continue;
            };
            let score = preference.weighted(&first.criteria());
            if best.as_ref().is_none_or(|(_, s, _)| score < *s) {
                best = Some((i, score, first));
            }
        }

        let Some((i, _, hop)) = best else {
            break;
        };
        let stop = remaining.remove(i);
        tour.totals = tour.totals + hop.criteria();
        clock = hop.arrival_time();
        current = stop;
        tour.order.push(stop);
        tour.hops.push(hop);
    }

    tour.unreachable = remaining;
    debug!(
        stops = tour.order.len(),
        unreachable = tour.unreachable.len(),
        duration = tour.totals.duration_mins,
        "tour planned"
    );
    Ok(tour)
}
