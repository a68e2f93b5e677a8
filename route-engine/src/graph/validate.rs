//! Load-time validation of network datasets.

use std::collections::{HashMap, HashSet};

use super::dataset::GraphDataset;
use crate::domain::{EdgeId, NodeId};

/// Reasons a dataset is rejected at load.
///
/// A rejected load never replaces the graph currently serving requests.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("duplicate edge id {0}")]
    DuplicateEdge(EdgeId),

    #[error("node {0} has an invalid coordinate")]
    InvalidCoordinate(NodeId),

    /// An edge references a node that does not exist
    #[error("edge {edge} references unknown node {node}")]
    UnknownNode { edge: EdgeId, node: NodeId },

    #[error("edge {edge} has negative duration {value}")]
    NegativeDuration { edge: EdgeId, value: f64 },

    #[error("edge {edge} has negative fare {value}")]
    NegativeFare { edge: EdgeId, value: f64 },

    #[error("edge {edge} has negative distance {value}")]
    NegativeDistance { edge: EdgeId, value: f64 },

    #[error("edge {edge} has non-finite {field}")]
    NonFinite { edge: EdgeId, field: &'static str },

    #[error("edge {edge} has an invalid schedule: {reason}")]
    InvalidSchedule { edge: EdgeId, reason: &'static str },

    /// A loop of zero-duration edges would allow free infinite travel
    #[error("zero-duration cycle through {} edge(s) starting at {}", .0.len(), .0[0])]
    ZeroDurationCycle(Vec<EdgeId>),
}

/// Check every node and edge record, then look for zero-duration cycles.
pub(super) fn validate_dataset(dataset: &GraphDataset) -> Result<(), ValidationError> {
    let mut node_ids = HashSet::with_capacity(dataset.nodes.len());
    for node in &dataset.nodes {
        if !node_ids.insert(node.id) {
            return Err(ValidationError::DuplicateNode(node.id));
        }
        let lat_ok = node.lat.is_finite() && (-90.0..=90.0).contains(&node.lat);
        let lon_ok = node.lon.is_finite() && (-180.0..=180.0).contains(&node.lon);
        if !lat_ok || !lon_ok {
            return Err(ValidationError::InvalidCoordinate(node.id));
        }
    }

    let mut edge_ids = HashSet::with_capacity(dataset.edges.len());
    for edge in &dataset.edges {
        if !edge_ids.insert(edge.id) {
            return Err(ValidationError::DuplicateEdge(edge.id));
        }
        for node in [edge.from, edge.to] {
            if !node_ids.contains(&node) {
                return Err(ValidationError::UnknownNode {
                    edge: edge.id,
                    node,
                });
            }
        }

        if !edge.duration_mins.is_finite() {
            return Err(ValidationError::NonFinite {
                edge: edge.id,
                field: "duration",
            });
        }
        if edge.duration_mins < 0.0 {
            return Err(ValidationError::NegativeDuration {
                edge: edge.id,
                value: edge.duration_mins,
            });
        }
        if !edge.fare.is_finite() {
            return Err(ValidationError::NonFinite {
                edge: edge.id,
                field: "fare",
            });
        }
        if edge.fare < 0.0 {
            return Err(ValidationError::NegativeFare {
                edge: edge.id,
                value: edge.fare,
            });
        }
        if let Some(distance) = edge.distance_m {
            if !distance.is_finite() {
                return Err(ValidationError::NonFinite {
                    edge: edge.id,
                    field: "distance",
                });
            }
            if distance < 0.0 {
                return Err(ValidationError::NegativeDistance {
                    edge: edge.id,
                    value: distance,
                });
            }
        }
        if let Some(schedule) = &edge.schedule {
            schedule
                .validate()
                .map_err(|reason| ValidationError::InvalidSchedule {
                    edge: edge.id,
                    reason,
                })?;
        }
    }

    if let Some(cycle) = find_zero_duration_cycle(dataset) {
        return Err(ValidationError::ZeroDurationCycle(cycle));
    }

    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Grey,
    Black,
}

/// Depth-first search over the subgraph of zero-duration edges.
///
/// Returns the edges of the first cycle found, in travel order.
fn find_zero_duration_cycle(dataset: &GraphDataset) -> Option<Vec<EdgeId>> {
    let index: HashMap<NodeId, usize> = dataset
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id, i))
        .collect();

    let mut adjacency: Vec<Vec<(usize, EdgeId)>> = vec![Vec::new(); dataset.nodes.len()];
    for edge in dataset.edges.iter().filter(|e| e.duration_mins == 0.0) {
        if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
            adjacency[from].push((to, edge.id));
        }
    }

    let mut colour = vec![Colour::White; adjacency.len()];
    for start in 0..adjacency.len() {
        if colour[start] != Colour::White || adjacency[start].is_empty() {
            continue;
        }

        // (node, next child to visit); entered_by[i] is the edge into stack[i + 1]
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        let mut entered_by: Vec<EdgeId> = Vec::new();
        colour[start] = Colour::Grey;

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            match adjacency[node].get(top.1) {
                Some(&(target, edge)) => {
                    top.1 += 1;
                    match colour[target] {
                        Colour::White => {
                            colour[target] = Colour::Grey;
                            stack.push((target, 0));
                            entered_by.push(edge);
                        }
                        Colour::Grey => {
                            let pos = stack.iter().position(|(n, _)| *n == target)?;
                            let mut cycle = entered_by[pos..].to_vec();
                            cycle.push(edge);
                            return Some(cycle);
                        }
                        Colour::Black => {}
                    }
                }
                None => {
                    colour[node] = Colour::Black;
                    stack.pop();
                    entered_by.pop();
                }
            }
        }
    }

    None
}
