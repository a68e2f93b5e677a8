//! Segment cost evaluation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::config::SearchConfig;
use crate::domain::time::add_minutes;
use crate::domain::{Criteria, Mode};
use crate::graph::Edge;
use crate::traffic::TrafficSnapshot;

/// Cost of traversing one edge, realised under a traffic snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentCost {
    /// Wait for the next scheduled departure.
    pub wait_mins: f64,
    /// When travel starts, after the wait.
    pub departs: DateTime<Utc>,
    /// Base duration scaled by congestion.
    pub travel_mins: f64,
    pub fare: f64,
    /// Whether this edge changes mode relative to the previous one.
    pub transfer: bool,
}

impl SegmentCost {
    /// Minutes the segment adds to the journey.
    pub fn duration_mins(&self) -> f64 {
        self.wait_mins + self.travel_mins
    }

    pub fn criteria(&self) -> Criteria {
        Criteria::new(self.duration_mins(), self.fare, u32::from(self.transfer))
    }
}

/// Pure cost function over a fixed traffic snapshot.
///
/// The same edge, time and previous mode always produce the same cost.
#[derive(Debug, Clone, Copy)]
pub struct WeightFunction<'a> {
    snapshot: &'a TrafficSnapshot,
    config: &'a SearchConfig,
}

impl<'a> WeightFunction<'a> {
    pub fn new(snapshot: &'a TrafficSnapshot, config: &'a SearchConfig) -> Self {
        Self { snapshot, config }
    }

    /// Cost of boarding `edge` at `at`, having arrived by `previous_mode`
    /// (`None` at the origin).
    ///
    /// Returns `None` when the edge is scheduled and has no departure left
    /// that day, or when the arrival would fall outside the representable
    /// calendar. Congestion is looked up in the bucket of the actual
    /// departure, after any wait.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_engine::domain::{EdgeId, Mode, NodeId};
    /// use route_engine::graph::Edge;
    /// use route_engine::planner::{SearchConfig, WeightFunction};
    /// use route_engine::traffic::{TrafficConfig, TrafficSnapshot};
    /// use chrono::Utc;
    ///
    /// let edge = Edge {
    ///     id: EdgeId(0),
    ///     from: NodeId(0),
    ///     to: NodeId(1),
    ///     mode: Mode::Bus,
    ///     distance_m: 900.0,
    ///     base_duration_mins: 5.0,
    ///     base_fare: 1.0,
    ///     schedule: None,
    /// };
    /// let snapshot = TrafficSnapshot::free_flow(&TrafficConfig::default());
    /// let config = SearchConfig::default();
    /// let weights = WeightFunction::new(&snapshot, &config);
    ///
    /// let cost = weights.cost(&edge, Utc::now(), Some(Mode::Walk)).unwrap();
    /// assert_eq!(cost.travel_mins, 5.0);
    /// assert!(cost.transfer);
    /// ```
    pub fn cost(
        &self,
        edge: &Edge,
        at: DateTime<Utc>,
        previous_mode: Option<Mode>,
    ) -> Option<SegmentCost> {
        let wait_mins = match &edge.schedule {
            Some(schedule) => schedule.wait_mins(at)?,
            None => 0.0,
        };
        let departs = add_minutes(at, wait_mins)?;
        let travel_mins = edge.base_duration_mins * self.snapshot.multiplier_at(edge.id, departs);
        add_minutes(departs, travel_mins)?;

        Some(SegmentCost {
            wait_mins,
            departs,
            travel_mins,
            fare: edge.base_fare + self.config.surcharge(edge.mode),
            transfer: previous_mode.is_some_and(|m| m != edge.mode),
        })
    }
}
