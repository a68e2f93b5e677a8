//! Serialized description of a transport network.
//!
//! The data-loading layer owns the on-disk format; this module only needs
//! it to resolve into nodes and edges. JSON is accepted directly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Schedule;
use crate::domain::{EdgeId, Mode, NodeId};

/// Errors reading a dataset from disk or text.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The file could not be read
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The contents are not a valid dataset document
    #[error("failed to parse dataset: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stop or intersection as it appears in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A mode-tagged segment as it appears in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub mode: Mode,
    /// Length in metres; derived from node coordinates when absent.
    #[serde(default)]
    pub distance_m: Option<f64>,
    pub duration_mins: f64,
    #[serde(default)]
    pub fare: f64,
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

impl EdgeRecord {
    /// Create an unscheduled edge record.
    pub fn new(id: u32, from: u32, to: u32, mode: Mode, duration_mins: f64, fare: f64) -> Self {
        Self {
            id: EdgeId(id),
            from: NodeId(from),
            to: NodeId(to),
            mode,
            distance_m: None,
            duration_mins,
            fare,
            schedule: None,
        }
    }

    /// Attach a departure schedule.
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Set an explicit length.
    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = Some(distance_m);
        self
    }
}

/// A complete network description: nodes plus directed edges.
///
/// # Examples
///
/// ```
/// use route_engine::graph::GraphDataset;
///
/// let json = r#"{
///     "nodes": [
///         {"id": 0, "name": "A", "lat": 0.31, "lon": 32.57},
///         {"id": 1, "name": "B", "lat": 0.32, "lon": 32.58}
///     ],
///     "edges": [
///         {"id": 0, "from": 0, "to": 1, "mode": "walk", "duration_mins": 10.0}
///     ]
/// }"#;
///
/// let dataset = GraphDataset::from_json_str(json).unwrap();
/// assert_eq!(dataset.nodes.len(), 2);
/// assert_eq!(dataset.edges[0].fare, 0.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDataset {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphDataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    pub fn node(mut self, id: u32, name: &str, lat: f64, lon: f64) -> Self {
        self.nodes.push(NodeRecord {
            id: NodeId(id),
            name: name.to_string(),
            lat,
            lon,
        });
        self
    }

    /// Add an edge.
    pub fn edge(mut self, edge: EdgeRecord) -> Self {
        self.edges.push(edge);
        self
    }

    /// Add the same segment in both directions with ids `id` and `id + 1`.
    pub fn two_way(mut self, id: u32, a: u32, b: u32, mode: Mode, duration_mins: f64, fare: f64) -> Self {
        self.edges
            .push(EdgeRecord::new(id, a, b, mode, duration_mins, fare));
        self.edges
            .push(EdgeRecord::new(id + 1, b, a, mode, duration_mins, fare));
        self
    }

    /// Parse a dataset from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON dataset file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, DatasetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builder_two_way() {
        let ds = GraphDataset::new()
            .node(0, "A", 0.0, 0.0)
            .node(1, "B", 0.0, 0.01)
            .two_way(10, 0, 1, Mode::Bus, 4.0, 1.5);

        assert_eq!(ds.edges.len(), 2);
        assert_eq!(ds.edges[0].id, EdgeId(10));
        assert_eq!(ds.edges[1].id, EdgeId(11));
        assert_eq!(ds.edges[1].from, NodeId(1));
        assert_eq!(ds.edges[1].to, NodeId(0));
    }

    #[test]
    fn parse_with_schedule() {
        let json = r#"{
            "nodes": [{"id": 0, "lat": 0.0, "lon": 0.0}, {"id": 1, "lat": 0.0, "lon": 0.0}],
            "edges": [{
                "id": 3, "from": 0, "to": 1, "mode": "bus",
                "duration_mins": 5.0, "fare": 1.0, "distance_m": 1200.0,
                "schedule": {"kind": "fixed", "departures": [480, 510]}
            }]
        }"#;
        let ds = GraphDataset::from_json_str(json).unwrap();
        let edge = &ds.edges[0];
        assert_eq!(edge.distance_m, Some(1200.0));
        assert!(matches!(edge.schedule, Some(Schedule::Fixed { .. })));
        assert_eq!(ds.nodes[0].name, "");
    }

    #[test]
    fn parse_rejects_unknown_mode() {
        let json = r#"{
            "nodes": [],
            "edges": [{"id": 0, "from": 0, "to": 1, "mode": "tram", "duration_mins": 1.0}]
        }"#;
        assert!(matches!(
            GraphDataset::from_json_str(json),
            Err(DatasetError::Json(_))
        ));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let ds = GraphDataset::new()
            .node(0, "A", 0.3, 32.5)
            .node(1, "B", 0.31, 32.51)
            .edge(EdgeRecord::new(0, 0, 1, Mode::Walk, 12.0, 0.0));
        std::fs::write(&path, ds.to_json_string().unwrap()).unwrap();

        let loaded = GraphDataset::from_path(&path).unwrap();
        assert_eq!(loaded, ds);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = GraphDataset::from_path("/nonexistent/graph.json").unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/graph.json"));
    }
}
