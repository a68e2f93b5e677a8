//! Short-lived cache of search outcomes.
//!
//! Identical requests arriving close together reuse the previous search.
//! The graph and traffic versions are part of the key, so an entry is never
//! served across a graph reload or traffic publish. Decay of stale samples
//! is time-dependent even within one traffic version; the TTL bounds how
//! long that drift can be served.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use serde::Deserialize;

use crate::domain::{EdgeId, Mode, NodeId};
use crate::planner::SearchOutcome;
use crate::scheduler::RouteRequest;

/// Everything that can change a search outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    origin: NodeId,
    destination: NodeId,
    departure_ms: i64,
    /// Preference weights as raw bits, so equal weights hash equally.
    preference: [u64; 3],
    allowed_modes: Option<Vec<Mode>>,
    avoid_edges: Vec<EdgeId>,
    offsets_mins: Vec<u32>,
    graph_version: u64,
    traffic_version: u64,
}

impl RouteKey {
    pub fn new(request: &RouteRequest, graph_version: u64, traffic_version: u64) -> Self {
        let p = &request.preference;
        Self {
            origin: request.origin,
            destination: request.destination,
            departure_ms: request.departure_time.timestamp_millis(),
            preference: [
                p.duration_weight.to_bits(),
                p.fare_weight.to_bits(),
                p.transfer_weight.to_bits(),
            ],
            allowed_modes: request
                .allowed_modes
                .as_ref()
                .map(|modes| modes.iter().copied().collect()),
            avoid_edges: request.avoid_edges.iter().copied().collect(),
            offsets_mins: request.departure_offsets_mins.clone(),
            graph_version,
            traffic_version,
        }
    }
}

/// Configuration for the cache.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for cached entries (seconds).
    pub ttl_secs: u64,

    /// Maximum number of cached entries. Zero disables caching.
    pub max_capacity: u64,
}

impl CacheConfig {
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        Self {
            ttl_secs,
            max_capacity,
        }
    }

    /// Returns the TTL as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30,
            max_capacity: 1000,
        }
    }
}

/// Cache of complete search outcomes.
pub struct RouteCache {
    entries: MokaCache<RouteKey, Arc<SearchOutcome>>,
    enabled: bool,
}

impl RouteCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .time_to_live(config.ttl())
            .max_capacity(config.max_capacity)
            .build();

        Self {
            entries,
            enabled: config.max_capacity > 0,
        }
    }

    /// Get a cached outcome.
    pub async fn get(&self, key: &RouteKey) -> Option<Arc<SearchOutcome>> {
        if !self.enabled {
            return None;
        }
        self.entries.get(key).await
    }

    /// Insert an outcome.
    pub async fn insert(&self, key: RouteKey, outcome: Arc<SearchOutcome>) {
        if self.enabled {
            self.entries.insert(key, outcome).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PreferenceProfile;
    use crate::planner::SearchStats;
    use chrono::{TimeZone, Utc};

    fn request() -> RouteRequest {
        let depart = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        RouteRequest::new(NodeId(0), NodeId(2), depart, PreferenceProfile::fastest())
    }

    fn outcome() -> Arc<SearchOutcome> {
        Arc::new(SearchOutcome {
            itineraries: Vec::new(),
            stats: SearchStats::default(),
        })
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(30));
        assert_eq!(config.max_capacity, 1000);
    }

    #[test]
    fn key_covers_request_options_and_versions() {
        let base = RouteKey::new(&request(), 1, 1);

        assert_eq!(base, RouteKey::new(&request(), 1, 1));
        assert_ne!(base, RouteKey::new(&request(), 2, 1));
        assert_ne!(base, RouteKey::new(&request(), 1, 2));
        assert_ne!(base, RouteKey::new(&request().avoiding([EdgeId(3)]), 1, 1));
        assert_ne!(base, RouteKey::new(&request().with_modes([Mode::Walk]), 1, 1));
        assert_ne!(base, RouteKey::new(&request().with_offsets([15]), 1, 1));

        let mut cheap = request();
        cheap.preference = PreferenceProfile::cheapest();
        assert_ne!(base, RouteKey::new(&cheap, 1, 1));
    }

    #[tokio::test]
    async fn insert_then_get() {
        let cache = RouteCache::new(&CacheConfig::default());
        let key = RouteKey::new(&request(), 1, 1);

        assert!(cache.get(&key).await.is_none());
        cache.insert(key.clone(), outcome()).await;
        assert!(cache.get(&key).await.is_some());

        // A new traffic version misses
        assert!(cache.get(&RouteKey::new(&request(), 1, 2)).await.is_none());
    }

    #[tokio::test]
    async fn zero_capacity_disables() {
        let cache = RouteCache::new(&CacheConfig::new(30, 0));
        let key = RouteKey::new(&request(), 1, 1);

        cache.insert(key.clone(), outcome()).await;
        assert!(cache.get(&key).await.is_none());
    }
}
