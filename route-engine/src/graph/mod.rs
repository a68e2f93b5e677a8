//! The transport network graph.
//!
//! A [`TransportGraph`] is built once from a [`GraphDataset`], validated, and
//! then shared read-only. [`GraphHandle`] serves the current graph and swaps
//! in replacements atomically on reload.

mod dataset;
mod handle;
mod network;
mod sample;
mod schedule;
mod validate;

pub use dataset::{DatasetError, EdgeRecord, GraphDataset, NodeRecord};
pub use handle::GraphHandle;
pub use network::{Coord, Edge, Node, NodeNotFound, TransportGraph};
pub use sample::kampala_network;
pub use schedule::Schedule;
pub use validate::ValidationError;
