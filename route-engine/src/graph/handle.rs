//! Hot-reloadable reference to the serving graph.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use super::dataset::GraphDataset;
use super::network::TransportGraph;
use super::validate::ValidationError;

/// Thread-safe holder of the current [`TransportGraph`].
///
/// Searches take an `Arc` of the current graph and keep using it for their
/// whole run. A reload builds the replacement off to the side and swaps it
/// in with a single pointer store; searches already in flight are
/// unaffected, and a rejected reload leaves the serving graph in place.
#[derive(Debug)]
pub struct GraphHandle {
    current: RwLock<Arc<TransportGraph>>,
    next_version: AtomicU64,
}

impl GraphHandle {
    /// Serve an already-loaded graph as version 1.
    pub fn new(graph: TransportGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(graph.with_version(1))),
            next_version: AtomicU64::new(2),
        }
    }

    /// Load a dataset and serve it.
    pub fn load(dataset: GraphDataset) -> Result<Self, ValidationError> {
        Ok(Self::new(TransportGraph::load(dataset)?))
    }

    /// The graph new searches should use.
    pub fn current(&self) -> Arc<TransportGraph> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Version of the graph currently served.
    pub fn version(&self) -> u64 {
        self.current().version()
    }

    /// Validate a new dataset and, if it passes, atomically replace the graph.
    ///
    /// On failure the existing graph is preserved and the error is returned.
    pub fn reload(&self, dataset: GraphDataset) -> Result<Arc<TransportGraph>, ValidationError> {
        let graph = match TransportGraph::load(dataset) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(error = %e, version = self.version(), "graph reload rejected, keeping current graph");
                return Err(e);
            }
        };
        Ok(self.replace(graph))
    }

    /// Install an already-validated graph.
    pub fn replace(&self, graph: TransportGraph) -> Arc<TransportGraph> {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let graph = Arc::new(graph.with_version(version));

        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = graph.clone();

        info!(
            version,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph installed"
        );
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mode, NodeId};
    use crate::graph::EdgeRecord;

    fn small() -> GraphDataset {
        GraphDataset::new()
            .node(0, "A", 0.0, 0.0)
            .node(1, "B", 0.0, 0.01)
            .edge(EdgeRecord::new(0, 0, 1, Mode::Walk, 10.0, 0.0))
    }

    #[test]
    fn reload_swaps_graph() {
        let handle = GraphHandle::load(small()).unwrap();
        assert_eq!(handle.version(), 1);

        let bigger = small().node(2, "C", 0.0, 0.02);
        handle.reload(bigger).unwrap();

        assert_eq!(handle.version(), 2);
        assert!(handle.current().contains_node(NodeId(2)));
    }

    #[test]
    fn failed_reload_keeps_current_graph() {
        let handle = GraphHandle::load(small()).unwrap();

        let broken = small().edge(EdgeRecord::new(1, 0, 9, Mode::Walk, 1.0, 0.0));
        assert!(handle.reload(broken).is_err());

        assert_eq!(handle.version(), 1);
        assert_eq!(handle.current().edge_count(), 1);
    }

    #[test]
    fn in_flight_reference_survives_reload() {
        let handle = GraphHandle::load(small()).unwrap();
        let held = handle.current();

        handle
            .reload(GraphDataset::new().node(5, "Z", 0.0, 0.0))
            .unwrap();

        // The held Arc still sees the graph it acquired
        assert_eq!(held.version(), 1);
        assert!(held.contains_node(NodeId(0)));
        assert!(!handle.current().contains_node(NodeId(0)));
    }
}
