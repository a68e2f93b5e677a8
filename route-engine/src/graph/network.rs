//! The immutable transport graph.
//!
//! Nodes and edges are created once by [`TransportGraph::load`] and never
//! mutated afterwards, so any number of searches may read a graph
//! concurrently through an `Arc` without locking.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use super::dataset::GraphDataset;
use super::validate::{ValidationError, validate_dataset};
use super::Schedule;
use crate::domain::{EdgeId, Mode, NodeId};

/// Error returned when a node id is not part of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("node {0} not found in graph")]
pub struct NodeNotFound(pub NodeId);

/// A WGS-84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: Coord) -> f64 {
        const R: f64 = 6_371_000.0;

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
        R * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A stop or intersection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub coord: Coord,
    /// Modes of the edges leaving this node.
    pub modes: BTreeSet<Mode>,
}

/// A directed, mode-tagged segment with static base attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub mode: Mode,
    pub distance_m: f64,
    /// Free-flow travel time in minutes
    pub base_duration_mins: f64,
    pub base_fare: f64,
    pub schedule: Option<Schedule>,
}

/// Directed multi-modal graph: each node maps to its outgoing edges.
///
/// # Invariants
///
/// - Every edge's `from` and `to` exist in the graph
/// - Durations, fares and distances are finite and non-negative
/// - The zero-duration edges contain no cycle
///
/// # Examples
///
/// ```
/// use route_engine::domain::{Mode, NodeId};
/// use route_engine::graph::{EdgeRecord, GraphDataset, TransportGraph};
///
/// let dataset = GraphDataset::new()
///     .node(0, "A", 0.31, 32.57)
///     .node(1, "B", 0.32, 32.58)
///     .edge(EdgeRecord::new(0, 0, 1, Mode::Walk, 10.0, 0.0));
///
/// let graph = TransportGraph::load(dataset).unwrap();
/// assert_eq!(graph.neighbors(NodeId(0)).count(), 1);
/// assert!(graph.node(NodeId(5)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TransportGraph {
    nodes: Vec<Node>,
    node_index: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
    edge_index: HashMap<EdgeId, usize>,
    /// Outgoing edge positions per node position, in dataset order.
    outgoing: Vec<Vec<usize>>,
    version: u64,
}

impl TransportGraph {
    /// Validate a dataset and build the graph from it.
    ///
    /// Missing edge distances are derived from node coordinates. Fixed
    /// schedules are sorted.
    pub fn load(dataset: GraphDataset) -> Result<Self, ValidationError> {
        validate_dataset(&dataset)?;

        let node_index: HashMap<NodeId, usize> = dataset
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();

        let mut nodes: Vec<Node> = dataset
            .nodes
            .into_iter()
            .map(|n| Node {
                id: n.id,
                name: n.name,
                coord: Coord::new(n.lat, n.lon),
                modes: BTreeSet::new(),
            })
            .collect();

        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut edges = Vec::with_capacity(dataset.edges.len());
        let mut edge_index = HashMap::with_capacity(dataset.edges.len());

        for record in dataset.edges {
            let (Some(&from), Some(&to)) =
                (node_index.get(&record.from), node_index.get(&record.to))
            else {
                return Err(ValidationError::UnknownNode {
                    edge: record.id,
                    node: record.from,
                });
            };

            let distance_m = record
                .distance_m
                .unwrap_or_else(|| nodes[from].coord.distance_m(nodes[to].coord));

            nodes[from].modes.insert(record.mode);
            outgoing[from].push(edges.len());
            edge_index.insert(record.id, edges.len());
            edges.push(Edge {
                id: record.id,
                from: record.from,
                to: record.to,
                mode: record.mode,
                distance_m,
                base_duration_mins: record.duration_mins,
                base_fare: record.fare,
                schedule: record.schedule.map(Schedule::normalise),
            });
        }

        Ok(TransportGraph {
            nodes,
            node_index,
            edges,
            edge_index,
            outgoing,
            version: 0,
        })
    }

    /// Stamp the graph with the version it is published under.
    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Version assigned when the graph was installed (0 if never installed).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&Node, NodeNotFound> {
        self.node_index
            .get(&id)
            .map(|&i| &self.nodes[i])
            .ok_or(NodeNotFound(id))
    }

    /// True if the node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    /// Look up an edge.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_index.get(&id).map(|&i| &self.edges[i])
    }

    /// Outgoing edges of a node, in dataset order.
    ///
    /// An unknown node has no neighbors.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.node_index
            .get(&id)
            .map(|&i| self.outgoing[i].as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&e| &self.edges[e])
    }

    /// All nodes, in dataset order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges, in dataset order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
