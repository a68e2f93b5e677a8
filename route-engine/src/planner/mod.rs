//! Multi-criteria route planner.
//!
//! This module implements the search that answers: "what are the best
//! trade-offs between time, fare and transfers for getting from here to
//! there right now?"
//!
//! The search keeps a bag of non-dominated labels per node, scores edges
//! through a [`WeightFunction`] bound to one traffic snapshot, and returns a
//! Pareto set that [`rank_itineraries`] orders for presentation.

mod cancel;
mod config;
mod label;
mod rank;
mod search;
mod tour;
mod weight;


pub use cancel::CancelFlag;
pub use config::SearchConfig;
pub use rank::{deduplicate, rank_itineraries, remove_dominated, score_itineraries};
pub use search::{RouteError, RouteOptimizer, RouteQuery, SearchOutcome, SearchStats};
pub use tour::{Tour, plan_tour};
pub use weight::{SegmentCost, WeightFunction};
