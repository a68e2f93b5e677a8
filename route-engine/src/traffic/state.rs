//! Versioned, copy-on-write traffic table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::config::TrafficConfig;
use super::sample::{TrafficError, TrafficSample};
use crate::domain::{EdgeId, TimeBucket};

/// Decayed slowdowns below this are treated as free flow when evicting.
const EVICT_EPSILON: f64 = 1e-3;

type SampleKey = (EdgeId, TimeBucket);

/// One published version of the table. Never mutated once shared.
#[derive(Debug, Default)]
struct TrafficTable {
    samples: HashMap<SampleKey, TrafficSample>,
    version: u64,
}

/// Process-wide congestion overlay.
///
/// Writers are serialized by an internal mutex and publish a fresh table
/// behind an `Arc` swap; readers clone the `Arc` and never observe a
/// partially applied batch. Each `(edge, bucket)` key holds at most one
/// sample; newer samples overwrite older ones.
///
/// # Examples
///
/// ```
/// use route_engine::domain::{EdgeId, TimeBucket};
/// use route_engine::traffic::{TrafficConfig, TrafficState};
/// use chrono::Utc;
///
/// let state = TrafficState::new(TrafficConfig::default());
/// state.update(EdgeId(3), TimeBucket(32), 2.0).unwrap();
///
/// let snapshot = state.snapshot(Utc::now());
/// assert_eq!(snapshot.multiplier(EdgeId(3), TimeBucket(32)), 2.0);
/// assert_eq!(snapshot.multiplier(EdgeId(4), TimeBucket(32)), 1.0);
/// ```
#[derive(Debug)]
pub struct TrafficState {
    config: TrafficConfig,
    current: RwLock<Arc<TrafficTable>>,
    writer: Mutex<()>,
}

impl TrafficState {
    pub fn new(config: TrafficConfig) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(TrafficTable::default())),
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    /// Record one observation made now. Returns the published version.
    pub fn update(
        &self,
        edge: EdgeId,
        bucket: TimeBucket,
        multiplier: f64,
    ) -> Result<u64, TrafficError> {
        let sample = TrafficSample::new(edge, bucket, multiplier, Utc::now())?;
        Ok(self.publish([sample]))
    }

    /// Publish a batch of samples as a single new version.
    pub fn publish(&self, samples: impl IntoIterator<Item = TrafficSample>) -> u64 {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.load();
        let mut next = current.samples.clone();
        let mut written = 0usize;
        for sample in samples {
            next.insert((sample.edge(), sample.bucket()), sample);
            written += 1;
        }

        let version = current.version + 1;
        self.store(TrafficTable {
            samples: next,
            version,
        });

        debug!(version, written, "traffic published");
        version
    }

    /// Drop samples whose decayed slowdown has faded to free flow.
    ///
    /// Returns the number of samples removed. No version is published when
    /// nothing was removed.
    pub fn evict_expired(&self, as_of: DateTime<Utc>) -> usize {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.load();
        let staleness = f64::from(self.config.staleness_window_mins);
        let next: HashMap<SampleKey, TrafficSample> = current
            .samples
            .iter()
            .filter(|(_, s)| s.effective_multiplier(as_of, staleness) - 1.0 > EVICT_EPSILON)
            .map(|(k, s)| (*k, s.clone()))
            .collect();

        let removed = current.samples.len() - next.len();
        if removed > 0 {
            let version = current.version + 1;
            self.store(TrafficTable {
                samples: next,
                version,
            });
            info!(version, removed, "expired traffic samples evicted");
        }
        removed
    }

    /// Immutable view of the current table, with decay evaluated at `as_of`.
    pub fn snapshot(&self, as_of: DateTime<Utc>) -> TrafficSnapshot {
        TrafficSnapshot {
            table: self.load(),
            as_of,
            bucket_mins: self.config.bucket_mins,
            staleness_mins: f64::from(self.config.staleness_window_mins),
        }
    }

    /// Version of the current table (0 before the first publish).
    pub fn version(&self) -> u64 {
        self.load().version
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.load().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self) -> Arc<TrafficTable> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, table: TrafficTable) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
    }
}

impl Default for TrafficState {
    fn default() -> Self {
        Self::new(TrafficConfig::default())
    }
}

/// A consistent read-only view of the traffic table.
///
/// Every lookup made through one snapshot sees the same version, regardless
/// of updates published after it was taken.
#[derive(Debug, Clone)]
pub struct TrafficSnapshot {
    table: Arc<TrafficTable>,
    as_of: DateTime<Utc>,
    bucket_mins: u32,
    staleness_mins: f64,
}

impl TrafficSnapshot {
    /// A snapshot with no congestion anywhere.
    pub fn free_flow(config: &TrafficConfig) -> Self {
        Self {
            table: Arc::new(TrafficTable::default()),
            as_of: DateTime::<Utc>::MIN_UTC,
            bucket_mins: config.bucket_mins,
            staleness_mins: f64::from(config.staleness_window_mins),
        }
    }

    /// Congestion multiplier for an edge in a bucket; 1.0 when unknown.
    ///
    /// Always at least 1.0.
    pub fn multiplier(&self, edge: EdgeId, bucket: TimeBucket) -> f64 {
        self.table
            .samples
            .get(&(edge, bucket))
            .map(|s| s.effective_multiplier(self.as_of, self.staleness_mins))
            .unwrap_or(1.0)
            .max(1.0)
    }

    /// Multiplier for an edge entered at `at`.
    pub fn multiplier_at(&self, edge: EdgeId, at: DateTime<Utc>) -> f64 {
        self.multiplier(edge, self.bucket_of(at))
    }

    /// The bucket containing `at`.
    pub fn bucket_of(&self, at: DateTime<Utc>) -> TimeBucket {
        TimeBucket::of(at, self.bucket_mins)
    }

    pub fn version(&self) -> u64 {
        self.table.version
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn len(&self) -> usize {
        self.table.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.samples.is_empty()
    }
}
