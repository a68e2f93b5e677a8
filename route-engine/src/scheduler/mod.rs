//! Request scheduling.
//!
//! [`RequestScheduler`] owns a fixed pool of workers fed by a bounded
//! queue. It applies backpressure by rejecting requests when the queue is
//! full, enforces a per-request timeout and lets clients cancel requests
//! they no longer need.

mod config;
mod pool;
mod request;

pub use config::SchedulerConfig;
pub use pool::{RequestScheduler, SchedulerError, Ticket};
pub use request::{RouteRequest, RouteResponse, RouteStatus};
