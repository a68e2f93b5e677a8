//! Domain types for the multi-modal routing engine.
//!
//! This module contains the value types shared by every component:
//! identifiers, travel modes, cost vectors, preferences and itineraries.
//! Types enforce their invariants at construction time, so code that
//! receives them can trust their validity.

mod criteria;
mod error;
mod ids;
mod itinerary;
mod mode;
mod preference;
pub mod time;

pub use criteria::{Criteria, Criterion};
pub use error::DomainError;
pub use ids::{EdgeId, NodeId, RequestId};
pub use itinerary::{Itinerary, Leg};
pub use mode::{InvalidMode, Mode};
pub use preference::PreferenceProfile;
pub use time::TimeBucket;
