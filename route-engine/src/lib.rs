//! Multi-modal route engine.
//!
//! Finds Pareto-optimal itineraries over a network of walking, bus, matatu
//! and boda-boda segments, with travel times adjusted by live traffic.
//! Requests run on a bounded worker pool that rejects work it cannot take
//! on, times out slow searches and honours client cancellation.

pub mod cache;
pub mod config;
pub mod domain;
pub mod graph;
pub mod planner;
pub mod scheduler;
pub mod traffic;
