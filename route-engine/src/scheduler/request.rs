//! Route request and response types at the scheduler boundary.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EdgeId, Itinerary, Mode, NodeId, PreferenceProfile, RequestId};
use crate::planner::{RouteQuery, SearchStats};

/// A route request as received from the outer layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: NodeId,
    pub destination: NodeId,
    pub departure_time: DateTime<Utc>,
    #[serde(default)]
    pub preference: PreferenceProfile,
    #[serde(default)]
    pub allowed_modes: Option<BTreeSet<Mode>>,
    #[serde(default)]
    pub avoid_edges: BTreeSet<EdgeId>,
    /// Extra departure times to try, in minutes after `departure_time`.
    #[serde(default)]
    pub departure_offsets_mins: Vec<u32>,
    /// Overrides the scheduler's default timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RouteRequest {
    /// Create a request with default options.
    pub fn new(
        origin: NodeId,
        destination: NodeId,
        departure_time: DateTime<Utc>,
        preference: PreferenceProfile,
    ) -> Self {
        Self {
            origin,
            destination,
            departure_time,
            preference,
            allowed_modes: None,
            avoid_edges: BTreeSet::new(),
            departure_offsets_mins: Vec::new(),
            timeout_ms: None,
        }
    }

    pub fn with_modes(mut self, modes: impl IntoIterator<Item = Mode>) -> Self {
        self.allowed_modes = Some(modes.into_iter().collect());
        self
    }

    pub fn avoiding(mut self, edges: impl IntoIterator<Item = EdgeId>) -> Self {
        self.avoid_edges.extend(edges);
        self
    }

    pub fn with_offsets(mut self, offsets_mins: impl IntoIterator<Item = u32>) -> Self {
        self.departure_offsets_mins = offsets_mins.into_iter().collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Per-request timeout, if one was set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// The optimizer query for the base departure time.
    pub fn query(&self) -> RouteQuery {
        RouteQuery {
            origin: self.origin,
            destination: self.destination,
            departure: self.departure_time,
            preference: self.preference,
            allowed_modes: self.allowed_modes.clone(),
            avoid_edges: self.avoid_edges.clone(),
        }
    }
}

/// Outcome category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Ok,
    NoRoute,
    /// Wall-clock limit hit; itineraries hold whatever was found.
    Timeout,
    /// Cancelled by the client.
    Cancelled,
    /// Origin or destination unknown.
    NotFound,
    Invalid,
    /// Admission queue full; the request never reached a worker.
    Overloaded,
    /// Internal failure or scheduler shut down.
    Failed,
}

/// Response for one request, matched to it by `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResponse {
    pub request_id: RequestId,
    pub status: RouteStatus,
    /// Ranked best-first.
    pub itineraries: Vec<Itinerary>,
    pub stats: SearchStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RouteResponse {
    /// Response carrying itineraries.
    pub fn found(
        request_id: RequestId,
        status: RouteStatus,
        itineraries: Vec<Itinerary>,
        stats: SearchStats,
    ) -> Self {
        Self {
            request_id,
            status,
            itineraries,
            stats,
            message: None,
        }
    }

    /// Response with no itineraries.
    pub fn empty(request_id: RequestId, status: RouteStatus, stats: SearchStats) -> Self {
        Self::found(request_id, status, Vec::new(), stats)
    }

    /// Response describing a failure.
    pub fn error(request_id: RequestId, status: RouteStatus, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty(request_id, status, SearchStats::default())
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RouteStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn depart() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap()
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_string(&RouteStatus::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&RouteStatus::NoRoute).unwrap(),
            "\"NO_ROUTE\""
        );
        assert_eq!(
            serde_json::to_string(&RouteStatus::Timeout).unwrap(),
            "\"TIMEOUT\""
        );
    }

    #[test]
    fn request_from_json_uses_defaults() {
        let json = r#"{
            "origin": 0,
            "destination": 2,
            "departure_time": "2024-03-15T08:00:00Z"
        }"#;
        let request: RouteRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request, RouteRequest::new(NodeId(0), NodeId(2), depart(), PreferenceProfile::default()));
        assert_eq!(request.timeout(), None);
    }

    #[test]
    fn request_from_json_with_options() {
        let json = r#"{
            "origin": 0,
            "destination": 2,
            "departure_time": "2024-03-15T08:00:00Z",
            "preference": {"duration_weight": 0, "fare_weight": 1, "transfer_weight": 0},
            "allowed_modes": ["walk", "bus"],
            "avoid_edges": [4],
            "timeout_ms": 250
        }"#;
        let request: RouteRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.preference, PreferenceProfile::cheapest());
        assert_eq!(request.timeout(), Some(Duration::from_millis(250)));

        let query = request.query();
        assert_eq!(query.departure, depart());
        assert!(query.avoid_edges.contains(&EdgeId(4)));
        assert_eq!(
            query.allowed_modes,
            Some([Mode::Walk, Mode::Bus].into_iter().collect())
        );
    }

    #[test]
    fn error_response_has_message() {
        let response = RouteResponse::error(RequestId(3), RouteStatus::Overloaded, "queue full");
        assert!(!response.is_ok());
        assert!(response.itineraries.is_empty());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "OVERLOADED");
        assert_eq!(json["message"], "queue full");
        assert_eq!(json["request_id"], 3);
    }
}
