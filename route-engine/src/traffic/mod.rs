//! Time-varying congestion overlay.
//!
//! The external feed adapter writes samples into [`TrafficState`]; each
//! search takes one [`TrafficSnapshot`] at its start and reads only that.
//! Stale samples decay toward free flow lazily, when a snapshot is read.

mod config;
mod sample;
mod state;

pub use config::TrafficConfig;
pub use sample::{TrafficError, TrafficSample};
pub use state::{TrafficSnapshot, TrafficState};
