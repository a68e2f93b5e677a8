//! Multi-criteria label-setting route search.
//!
//! A generalised Dijkstra: each node keeps a bag of non-dominated labels
//! rather than a single best cost, and the search returns every
//! non-dominated way of reaching the destination.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::domain::time::add_minutes;
use crate::domain::{
    Criteria, Criterion, DomainError, EdgeId, Itinerary, Leg, Mode, NodeId, PreferenceProfile,
};
use crate::graph::{Edge, NodeNotFound, TransportGraph};
use crate::traffic::TrafficSnapshot;

use super::cancel::CancelFlag;
use super::config::SearchConfig;
use super::label::{Label, LabelArena, LabelId};
use super::rank::{deduplicate, rank_itineraries, remove_dominated};
use super::weight::WeightFunction;

/// Error from route search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    /// Origin or destination is not in the graph
    #[error(transparent)]
    NodeNotFound(#[from] NodeNotFound),

    /// Invalid route request
    #[error("invalid route request: {0}")]
    InvalidRequest(String),

    /// A reconstructed path failed itinerary validation
    #[error("search produced a broken path: {0}")]
    BrokenPath(#[from] DomainError),
}

/// A single origin/destination query.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub origin: NodeId,
    pub destination: NodeId,
    pub departure: DateTime<Utc>,
    pub preference: PreferenceProfile,
    /// Modes the traveller accepts; `None` allows every mode.
    pub allowed_modes: Option<BTreeSet<Mode>>,
    /// Edges that must not be used.
    pub avoid_edges: BTreeSet<EdgeId>,
}

impl RouteQuery {
    /// Create a query with no mode or edge restrictions.
    pub fn new(
        origin: NodeId,
        destination: NodeId,
        departure: DateTime<Utc>,
        preference: PreferenceProfile,
    ) -> Self {
        Self {
            origin,
            destination,
            departure,
            preference,
            allowed_modes: None,
            avoid_edges: BTreeSet::new(),
        }
    }

    /// Restrict the query to the given modes.
    pub fn with_modes(mut self, modes: impl IntoIterator<Item = Mode>) -> Self {
        self.allowed_modes = Some(modes.into_iter().collect());
        self
    }

    /// Exclude the given edges.
    pub fn avoiding(mut self, edges: impl IntoIterator<Item = EdgeId>) -> Self {
        self.avoid_edges.extend(edges);
        self
    }

    /// True if the query may use this edge.
    pub fn permits(&self, edge: &Edge) -> bool {
        !self.avoid_edges.contains(&edge.id)
            && self
                .allowed_modes
                .as_ref()
                .is_none_or(|modes| modes.contains(&edge.mode))
    }

    /// Check the query against a graph.
    pub fn validate(&self, graph: &TransportGraph) -> Result<(), RouteError> {
        graph.node(self.origin)?;
        graph.node(self.destination)?;
        self.preference
            .validate()
            .map_err(|e| RouteError::InvalidRequest(e.to_string()))?;
        if self
            .allowed_modes
            .as_ref()
            .is_some_and(|modes| modes.is_empty())
        {
            return Err(RouteError::InvalidRequest(
                "no modes allowed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters describing one search run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Labels popped and expanded.
    pub expansions: usize,
    /// Labels that survived dominance checks.
    pub labels_created: usize,
    /// The expansion budget ran out before the queue emptied.
    pub budget_exhausted: bool,
    /// The cancellation flag stopped the search.
    pub interrupted: bool,
}

impl SearchStats {
    /// Combine counters from independent sub-searches.
    pub fn merge(self, other: SearchStats) -> SearchStats {
        SearchStats {
            expansions: self.expansions + other.expansions,
            labels_created: self.labels_created + other.labels_created,
            budget_exhausted: self.budget_exhausted || other.budget_exhausted,
            interrupted: self.interrupted || other.interrupted,
        }
    }
}

/// Result of a search run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Pareto set, ranked best-first by the query's preference.
    pub itineraries: Vec<Itinerary>,
    pub stats: SearchStats,
}

impl SearchOutcome {
    /// True when the destination was never reached.
    pub fn is_no_route(&self) -> bool {
        self.itineraries.is_empty()
    }

    /// True when the search stopped early, so the set may be incomplete.
    pub fn is_partial(&self) -> bool {
        self.stats.budget_exhausted || self.stats.interrupted
    }
}

/// Priority queue entry. Ordered so `BinaryHeap` pops the smallest
/// primary criterion first, then fewest transfers, then oldest label.
#[derive(Debug)]
struct QueueEntry {
    key: f64,
    transfers: u32,
    seq: usize,
    label: LabelId,
}

impl QueueEntry {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then(self.transfers.cmp(&other.transfers))
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_key(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cmp_key(self)
    }
}

/// Route optimizer over one graph and one traffic snapshot.
///
/// Holds only shared references, so one optimizer can serve parallel
/// sub-searches.
pub struct RouteOptimizer<'a> {
    graph: &'a TransportGraph,
    snapshot: &'a TrafficSnapshot,
    config: &'a SearchConfig,
}

impl<'a> RouteOptimizer<'a> {
    /// Create a new optimizer.
    pub fn new(
        graph: &'a TransportGraph,
        snapshot: &'a TrafficSnapshot,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            graph,
            snapshot,
            config,
        }
    }

    /// Find the Pareto set of itineraries for a query.
    ///
    /// An empty result means no route was found. Exhausting the expansion
    /// budget or being cancelled is not an error: the outcome carries
    /// whatever destination labels were found, flagged in its stats.
    pub fn search(
        &self,
        query: &RouteQuery,
        cancel: &CancelFlag,
    ) -> Result<SearchOutcome, RouteError> {
        query.validate(self.graph)?;

        if query.origin == query.destination {
            return Ok(SearchOutcome {
                itineraries: vec![Itinerary::stay(query.origin, query.departure)],
                stats: SearchStats::default(),
            });
        }

        let weights = WeightFunction::new(self.snapshot, self.config);
        let primary = query.preference.primary();
        let destination = query.destination;

        let mut arena = LabelArena::new();
        let mut queue = BinaryHeap::new();
        let mut stats = SearchStats::default();
        let mut seq = 0usize;

        if let Some(root) = arena.insert(Label::origin(query.origin, query.departure), false) {
            queue.push(entry(&Criteria::ZERO, primary, seq, root));
            seq += 1;
            stats.labels_created += 1;
        }

        while let Some(QueueEntry { label: id, .. }) = queue.pop() {
            if !arena.is_alive(id) {
                continue;
            }
            let label = arena.get(id).clone();

            // Already matched by an itinerary in hand; cannot improve on it
            if arena.bag_covers(destination, &label.cost) {
                arena.kill(id);
                continue;
            }

            if stats.expansions >= self.config.max_expansions {
                stats.budget_exhausted = true;
                break;
            }
            let interval = self.config.cancel_check_interval.max(1);
            if stats.expansions % interval == 0 && cancel.is_cancelled() {
                stats.interrupted = true;
                break;
            }
            stats.expansions += 1;

            trace!(
                node = %label.node,
                duration = label.cost.duration_mins,
                fare = label.cost.fare,
                transfers = label.cost.transfers,
                "expanding label"
            );

            for edge in self.graph.neighbors(label.node) {
                if !query.permits(edge) {
                    continue;
                }
                let Some(segment) = weights.cost(edge, label.clock, label.last_mode) else {
                    continue;
                };

                let cost = label.cost + segment.criteria();
                if arena.bag_covers(destination, &cost) {
                    continue;
                }

                let leg = Leg {
                    edge: edge.id,
                    from: edge.from,
                    to: edge.to,
                    mode: edge.mode,
                    departure: segment.departs,
                    wait_mins: segment.wait_mins,
                    travel_mins: segment.travel_mins,
                    fare: segment.fare,
                    transfer: segment.transfer,
                };
                let next = Label {
                    node: edge.to,
                    cost,
                    last_mode: Some(edge.mode),
                    clock: leg.arrival(),
                    parent: Some(id),
                    leg: Some(leg),
                };

                let terminal = edge.to == destination;
                if let Some(next_id) = arena.insert(next, terminal) {
                    stats.labels_created += 1;
                    if !terminal {
                        queue.push(entry(&cost, primary, seq, next_id));
                        seq += 1;
                    }
                }
            }
        }

        let itineraries = arena
            .bag(destination)
            .map(|id| Itinerary::new(query.origin, query.departure, arena.path(id)))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            origin = %query.origin,
            destination = %query.destination,
            results = itineraries.len(),
            expansions = stats.expansions,
            labels = stats.labels_created,
            budget_exhausted = stats.budget_exhausted,
            interrupted = stats.interrupted,
            "route search complete"
        );

        Ok(SearchOutcome {
            itineraries: self.finish(itineraries, &query.preference),
            stats,
        })
    }

    /// Search the query's departure plus each later offset (minutes) as
    /// independent sub-searches in parallel, merging into one Pareto set.
    ///
    /// All sub-searches share this optimizer's graph and snapshot.
    pub fn search_with_offsets(
        &self,
        query: &RouteQuery,
        offsets_mins: &[u32],
        cancel: &CancelFlag,
    ) -> Result<SearchOutcome, RouteError> {
        if offsets_mins.is_empty() {
            return self.search(query, cancel);
        }

        let departures: Vec<DateTime<Utc>> = std::iter::once(0)
            .chain(offsets_mins.iter().copied())
            .filter_map(|offset| add_minutes(query.departure, f64::from(offset)))
            .collect();

        let outcomes = departures
            .par_iter()
            .map(|departure| {
                let shifted = RouteQuery {
                    departure: *departure,
                    ..query.clone()
                };
                self.search(&shifted, cancel)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = SearchStats::default();
        let mut merged = Vec::new();
        for outcome in outcomes {
            stats = stats.merge(outcome.stats);
            merged.extend(outcome.itineraries);
        }

        debug!(
            sub_searches = departures.len(),
            candidates = merged.len(),
            "offset searches merged"
        );

        Ok(SearchOutcome {
            itineraries: self.finish(merged, &query.preference),
            stats,
        })
    }

    /// Prune, rank and cap a candidate set.
    fn finish(&self, itineraries: Vec<Itinerary>, preference: &PreferenceProfile) -> Vec<Itinerary> {
        let itineraries = deduplicate(remove_dominated(itineraries));
        let mut ranked = rank_itineraries(itineraries, preference);
        ranked.truncate(self.config.max_results.max(1));
        ranked
    }
}

fn entry(cost: &Criteria, primary: Criterion, seq: usize, label: LabelId) -> QueueEntry {
    QueueEntry {
        key: cost.get(primary),
        transfers: cost.transfers,
        seq,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn edge(id: u32, mode: Mode) -> Edge {
        Edge {
            id: EdgeId(id),
            from: NodeId(0),
            to: NodeId(1),
            mode,
            distance_m: 100.0,
            base_duration_mins: 1.0,
            base_fare: 0.0,
            schedule: None,
        }
    }

    fn query() -> RouteQuery {
        let depart = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        RouteQuery::new(NodeId(0), NodeId(1), depart, PreferenceProfile::fastest())
    }

    #[test]
    fn queue_pops_smallest_key_then_transfers_then_oldest() {
        let mut heap = BinaryHeap::new();
        heap.push(QueueEntry { key: 5.0, transfers: 0, seq: 0, label: 0 });
        heap.push(QueueEntry { key: 3.0, transfers: 2, seq: 1, label: 1 });
        heap.push(QueueEntry { key: 3.0, transfers: 1, seq: 2, label: 2 });
        heap.push(QueueEntry { key: 3.0, transfers: 1, seq: 3, label: 3 });

        let order: Vec<LabelId> = std::iter::from_fn(|| heap.pop().map(|e| e.label)).collect();
        assert_eq!(order, vec![2, 3, 1, 0]);
    }

    #[test]
    fn permits_respects_modes_and_avoidance() {
        let q = query().with_modes([Mode::Walk, Mode::Bus]).avoiding([EdgeId(3)]);

        assert!(q.permits(&edge(1, Mode::Walk)));
        assert!(!q.permits(&edge(2, Mode::Boda)));
        assert!(!q.permits(&edge(3, Mode::Bus)));
        assert!(query().permits(&edge(3, Mode::Boda)));
    }

    #[test]
    fn stats_merge() {
        let a = SearchStats {
            expansions: 3,
            labels_created: 5,
            budget_exhausted: false,
            interrupted: true,
        };
        let b = SearchStats {
            expansions: 4,
            labels_created: 1,
            budget_exhausted: true,
            interrupted: false,
        };
        let merged = a.merge(b);
        assert_eq!(merged.expansions, 7);
        assert_eq!(merged.labels_created, 6);
        assert!(merged.budget_exhausted && merged.interrupted);
    }
}
