//! Bounded worker pool with admission control.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SchedulerConfig;
use super::request::{RouteRequest, RouteResponse, RouteStatus};
use crate::cache::{RouteCache, RouteKey};
use crate::config::EngineConfig;
use crate::domain::{EdgeId, PreferenceProfile, RequestId};
use crate::graph::GraphHandle;
use crate::planner::{CancelFlag, RouteError, RouteOptimizer, SearchConfig, SearchOutcome};
use crate::traffic::TrafficState;

/// Error from request admission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Admission queue is full
    #[error("request {request_id} rejected: admission queue full ({queue_depth} waiting)")]
    Overloaded {
        request_id: RequestId,
        queue_depth: usize,
    },

    /// Scheduler no longer accepts requests
    #[error("request {request_id} rejected: scheduler is shut down")]
    ShutDown { request_id: RequestId },
}

/// An accepted request awaiting its worker.
struct Job {
    id: RequestId,
    request: RouteRequest,
    cancel: CancelFlag,
    reply: oneshot::Sender<RouteResponse>,
    admitted: Instant,
}

/// Handle to an accepted request.
#[derive(Debug)]
pub struct Ticket {
    id: RequestId,
    cancel: CancelFlag,
    reply: oneshot::Receiver<RouteResponse>,
}

impl Ticket {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Ask the worker to abandon the request. It replies `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the response.
    pub async fn wait(self) -> RouteResponse {
        let id = self.id;
        self.reply.await.unwrap_or_else(|_| {
            RouteResponse::error(id, RouteStatus::Failed, "worker dropped the request")
        })
    }
}

/// State shared by every worker. Read-only apart from the cache.
struct Shared {
    graph: Arc<GraphHandle>,
    traffic: Arc<TrafficState>,
    search: SearchConfig,
    timeout: Duration,
    cache: RouteCache,
    cache_hits: AtomicU64,
}

/// Dispatches route requests to a fixed pool of workers.
///
/// Requests enter a bounded FIFO queue; when it is full new requests are
/// rejected immediately instead of waiting. Each request is handled start
/// to finish by one worker. Completion order is not guaranteed, so
/// responses carry the id assigned at admission.
pub struct RequestScheduler {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicU64,
    queue_depth: usize,
}

impl RequestScheduler {
    /// Spawn the worker pool on the current Tokio runtime.
    pub fn start(graph: Arc<GraphHandle>, traffic: Arc<TrafficState>, config: &EngineConfig) -> Self {
        let SchedulerConfig {
            workers,
            queue_depth,
            ..
        } = config.scheduler;
        let queue_depth = queue_depth.max(1);

        let shared = Arc::new(Shared {
            graph,
            traffic,
            search: config.search.clone(),
            timeout: config.scheduler.request_timeout(),
            cache: RouteCache::new(&config.cache),
            cache_hits: AtomicU64::new(0),
        });

        let (sender, receiver) = mpsc::channel(queue_depth);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let handles = (0..workers.max(1))
            .map(|index| tokio::spawn(worker(index, receiver.clone(), shared.clone())))
            .collect();

        info!(workers, queue_depth, "request scheduler started");

        Self {
            sender: Mutex::new(Some(sender)),
            shared,
            workers: Mutex::new(handles),
            next_id: AtomicU64::new(1),
            queue_depth,
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Admit a request, or reject it at once if the queue is full.
    pub fn submit(&self, request: RouteRequest) -> Result<Ticket, SchedulerError> {
        let id = self.next_request_id();
        let cancel = CancelFlag::new();
        let (reply, receiver) = oneshot::channel();
        let job = Job {
            id,
            request,
            cancel: cancel.clone(),
            reply,
            admitted: Instant::now(),
        };

        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(SchedulerError::ShutDown { request_id: id });
        };

        match sender.try_send(job) {
            Ok(()) => {
                debug!(request_id = %id, "request admitted");
                Ok(Ticket {
                    id,
                    cancel,
                    reply: receiver,
                })
            }
            Err(TrySendError::Full(_)) => {
                warn!(request_id = %id, queue_depth = self.queue_depth, "admission queue full, rejecting");
                Err(SchedulerError::Overloaded {
                    request_id: id,
                    queue_depth: self.queue_depth,
                })
            }
            Err(TrySendError::Closed(_)) => Err(SchedulerError::ShutDown { request_id: id }),
        }
    }

    /// Submit a request and wait for its response.
    ///
    /// Admission failures are reported as responses too.
    pub async fn route(&self, request: RouteRequest) -> RouteResponse {
        match self.submit(request) {
            Ok(ticket) => ticket.wait().await,
            Err(SchedulerError::Overloaded { request_id, .. }) => RouteResponse::error(
                request_id,
                RouteStatus::Overloaded,
                "admission queue full",
            ),
            Err(e @ SchedulerError::ShutDown { request_id }) => {
                RouteResponse::error(request_id, RouteStatus::Failed, e.to_string())
            }
        }
    }

    /// Route many requests concurrently. Responses are returned in request
    /// order; requests beyond the queue's capacity come back `Overloaded`.
    pub async fn route_batch(&self, requests: Vec<RouteRequest>) -> Vec<RouteResponse> {
        join_all(requests.into_iter().map(|r| self.route(r))).await
    }

    /// Routes between the ends of a congested road that avoid the road
    /// itself, in every mode.
    pub async fn alternatives_avoiding(
        &self,
        road: EdgeId,
        departure: DateTime<Utc>,
        preference: PreferenceProfile,
    ) -> RouteResponse {
        let graph = self.shared.graph.current();
        let Some(edge) = graph.edge(road) else {
            return RouteResponse::error(
                self.next_request_id(),
                RouteStatus::NotFound,
                format!("edge {road} not found in graph"),
            );
        };

        let parallel: Vec<EdgeId> = graph
            .neighbors(edge.from)
            .filter(|e| e.to == edge.to)
            .map(|e| e.id)
            .collect();
        let request =
            RouteRequest::new(edge.from, edge.to, departure, preference).avoiding(parallel);
        self.route(request).await
    }

    /// Number of requests answered from the cache.
    pub fn cache_hits(&self) -> u64 {
        self.shared.cache_hits.load(Ordering::Relaxed)
    }

    /// Stop admitting requests, let queued ones finish, and wait for the
    /// workers to exit.
    pub async fn shutdown(&self) {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        let handles: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in join_all(handles).await {
            if let Err(e) = handle {
                warn!(error = %e, "worker ended abnormally");
            }
        }
        info!("request scheduler stopped");
    }
}

async fn worker(
    index: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    shared: Arc<Shared>,
) {
    loop {
        // Hold the lock only while waiting, so jobs are taken in FIFO order
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        let queued = job.admitted.elapsed();
        let response = shared.handle(job.id, job.request, job.cancel).await;
        debug!(
            worker = index,
            request_id = %job.id,
            status = ?response.status,
            queued_ms = queued.as_millis(),
            "request finished"
        );
        // The client may have stopped waiting
        let _ = job.reply.send(response);
    }
    debug!(worker = index, "worker exiting");
}

impl Shared {
    async fn handle(&self, id: RequestId, request: RouteRequest, cancel: CancelFlag) -> RouteResponse {
        if cancel.is_cancelled() {
            return RouteResponse::error(id, RouteStatus::Cancelled, "cancelled before start");
        }

        let graph = self.graph.current();
        let snapshot = self.traffic.snapshot(Utc::now());
        let key = RouteKey::new(&request, graph.version(), snapshot.version());

        if let Some(hit) = self.cache.get(&key).await {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = %id, "answered from cache");
            return RouteResponse::found(id, RouteStatus::Ok, hit.itineraries.clone(), hit.stats);
        }

        let timeout = request.timeout().unwrap_or(self.timeout);
        let query = request.query();
        let offsets = request.departure_offsets_mins.clone();
        let search = self.search.clone();
        let task_cancel = cancel.clone();

        let mut task = tokio::task::spawn_blocking(move || {
            RouteOptimizer::new(&graph, &snapshot, &search).search_with_offsets(
                &query,
                &offsets,
                &task_cancel,
            )
        });

        let (joined, timed_out) = tokio::select! {
            joined = &mut task => (joined, false),
            _ = tokio::time::sleep(timeout) => {
                // The search notices within one check interval
                cancel.cancel();
                (task.await, true)
            }
        };

        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(RouteError::NodeNotFound(e))) => {
                return RouteResponse::error(id, RouteStatus::NotFound, e.to_string());
            }
            Ok(Err(e @ RouteError::InvalidRequest(_))) => {
                return RouteResponse::error(id, RouteStatus::Invalid, e.to_string());
            }
            Ok(Err(e)) => {
                warn!(request_id = %id, error = %e, "search failed");
                return RouteResponse::error(id, RouteStatus::Failed, e.to_string());
            }
            Err(e) => {
                warn!(request_id = %id, error = %e, "search task failed");
                return RouteResponse::error(id, RouteStatus::Failed, "search task failed");
            }
        };

        self.respond(id, outcome, timed_out, key).await
    }

    async fn respond(
        &self,
        id: RequestId,
        outcome: SearchOutcome,
        timed_out: bool,
        key: RouteKey,
    ) -> RouteResponse {
        let stats = outcome.stats;

        if stats.interrupted && !timed_out {
            debug!(request_id = %id, "request cancelled");
            return RouteResponse::empty(id, RouteStatus::Cancelled, stats);
        }

        if outcome.is_no_route() {
            return RouteResponse::empty(id, RouteStatus::NoRoute, stats);
        }

        // Wall-clock limit or expansion budget hit: best-effort set, uncached
        if outcome.is_partial() {
            info!(
                request_id = %id,
                partial = outcome.itineraries.len(),
                timed_out,
                budget_exhausted = stats.budget_exhausted,
                "request cut short"
            );
            return RouteResponse::found(id, RouteStatus::Timeout, outcome.itineraries, stats);
        }

        let outcome = Arc::new(outcome);
        self.cache.insert(key, outcome.clone()).await;
        RouteResponse::found(id, RouteStatus::Ok, outcome.itineraries.clone(), stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mode, NodeId};
    use crate::graph::{EdgeRecord, GraphDataset};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    fn abc() -> GraphDataset {
        GraphDataset::new()
            .node(0, "A", 0.3146, 32.5761)
            .node(1, "B", 0.3191, 32.5836)
            .node(2, "C", 0.3175, 32.5800)
            .node(3, "D", 0.3500, 32.5600)
            .edge(EdgeRecord::new(0, 0, 1, Mode::Walk, 10.0, 0.0))
            .edge(EdgeRecord::new(1, 1, 2, Mode::Bus, 5.0, 1.0))
            .edge(EdgeRecord::new(2, 0, 2, Mode::Boda, 8.0, 3.0))
    }

    /// A square grid with walk, matatu and boda between neighbours. Large
    /// enough that a full Pareto search takes far longer than a few
    /// milliseconds.
    fn grid(side: u32) -> GraphDataset {
        let mut ds = GraphDataset::new();
        for r in 0..side {
            for c in 0..side {
                ds = ds.node(r * side + c, "G", f64::from(r) * 0.001, f64::from(c) * 0.001);
            }
        }
        let mut id = 0;
        for r in 0..side {
            for c in 0..side {
                let here = r * side + c;
                let mut next = Vec::new();
                if c + 1 < side {
                    next.push(here + 1);
                }
                if r + 1 < side {
                    next.push(here + side);
                }
                for there in next {
                    let spread = f64::from((r * 7 + c * 3) % 5);
                    ds = ds
                        .two_way(id, here, there, Mode::Walk, 6.0 + spread, 0.0)
                        .two_way(id + 2, here, there, Mode::Matatu, 2.0 + spread * 0.5, 1.0)
                        .two_way(id + 4, here, there, Mode::Boda, 1.0, 3.0 + spread);
                    id += 6;
                }
            }
        }
        ds
    }

    fn scheduler(dataset: GraphDataset, config: &EngineConfig) -> RequestScheduler {
        let graph = Arc::new(GraphHandle::load(dataset).unwrap());
        let traffic = Arc::new(TrafficState::default());
        RequestScheduler::start(graph, traffic, config)
    }

    fn config(workers: usize, queue_depth: usize, timeout_ms: u64) -> EngineConfig {
        EngineConfig {
            scheduler: SchedulerConfig::new(workers, queue_depth, timeout_ms),
            ..EngineConfig::default()
        }
    }

    fn request(origin: u32, destination: u32) -> RouteRequest {
        RouteRequest::new(
            NodeId(origin),
            NodeId(destination),
            at(8, 0),
            PreferenceProfile::fastest(),
        )
    }

    #[tokio::test]
    async fn routes_scenario_graph() {
        let s = scheduler(abc(), &config(2, 8, 2000));
        let response = s.route(request(0, 2)).await;

        assert_eq!(response.status, RouteStatus::Ok);
        assert_eq!(response.itineraries.len(), 2);
        assert_eq!(response.itineraries[0].edge_ids().collect::<Vec<_>>(), vec![EdgeId(2)]);
    }

    #[tokio::test]
    async fn unreachable_is_no_route() {
        let s = scheduler(abc(), &config(1, 8, 2000));
        let response = s.route(request(0, 3)).await;

        assert_eq!(response.status, RouteStatus::NoRoute);
        assert!(response.itineraries.is_empty());
    }

    #[tokio::test]
    async fn unknown_node_is_not_found() {
        let s = scheduler(abc(), &config(1, 8, 2000));
        let response = s.route(request(0, 42)).await;

        assert_eq!(response.status, RouteStatus::NotFound);
        assert_eq!(response.message.as_deref(), Some("node n42 not found in graph"));
    }

    #[tokio::test]
    async fn full_queue_rejects_immediately() {
        // Single-threaded runtime: the worker cannot take the first job
        // until this test yields, so the queue is observably full.
        let s = scheduler(abc(), &config(1, 1, 2000));

        let first = s.submit(request(0, 2)).unwrap();
        let second = s.submit(request(0, 2));
        assert!(matches!(
            second,
            Err(SchedulerError::Overloaded { queue_depth: 1, .. })
        ));

        let response = first.wait().await;
        assert_eq!(response.status, RouteStatus::Ok);
    }

    #[tokio::test]
    async fn overloaded_response_via_route() {
        let s = scheduler(abc(), &config(1, 1, 2000));
        let _first = s.submit(request(0, 2)).unwrap();

        let response = s.route(request(0, 2)).await;
        assert_eq!(response.status, RouteStatus::Overloaded);
    }

    #[tokio::test]
    async fn batch_matches_request_order() {
        let s = scheduler(abc(), &config(2, 8, 2000));
        let responses = s
            .route_batch(vec![request(0, 2), request(0, 3), request(1, 2)])
            .await;

        let statuses: Vec<RouteStatus> = responses.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![RouteStatus::Ok, RouteStatus::NoRoute, RouteStatus::Ok]
        );
        let ids: Vec<RequestId> = responses.iter().map(|r| r.request_id).collect();
        assert_eq!(ids, vec![RequestId(1), RequestId(2), RequestId(3)]);
    }

    #[tokio::test]
    async fn repeated_request_served_from_cache() {
        let s = scheduler(abc(), &config(1, 8, 2000));

        let first = s.route(request(0, 2)).await;
        let second = s.route(request(0, 2)).await;

        assert_eq!(s.cache_hits(), 1);
        assert_eq!(first.itineraries, second.itineraries);
        assert_ne!(first.request_id, second.request_id);
    }

    #[tokio::test]
    async fn traffic_publish_bypasses_cache() {
        let graph = Arc::new(GraphHandle::load(abc()).unwrap());
        let traffic = Arc::new(TrafficState::default());
        let s = RequestScheduler::start(graph, traffic.clone(), &config(1, 8, 2000));

        s.route(request(0, 2)).await;
        traffic.update(EdgeId(2), crate::domain::TimeBucket(0), 2.0).unwrap();
        s.route(request(0, 2)).await;

        assert_eq!(s.cache_hits(), 0);
    }

    #[tokio::test]
    async fn reload_affects_new_requests_only() {
        let graph = Arc::new(GraphHandle::load(abc()).unwrap());
        let s = RequestScheduler::start(
            graph.clone(),
            Arc::new(TrafficState::default()),
            &config(1, 8, 2000),
        );
        assert_eq!(s.route(request(0, 3)).await.status, RouteStatus::NoRoute);

        graph
            .reload(abc().edge(EdgeRecord::new(3, 2, 3, Mode::Walk, 4.0, 0.0)))
            .unwrap();
        assert_eq!(s.route(request(0, 3)).await.status, RouteStatus::Ok);
    }

    #[tokio::test]
    async fn alternatives_avoid_the_whole_road() {
        let s = scheduler(abc(), &config(1, 8, 2000));
        let response = s
            .alternatives_avoiding(EdgeId(2), at(8, 0), PreferenceProfile::fastest())
            .await;

        assert_eq!(response.status, RouteStatus::Ok);
        assert_eq!(response.itineraries.len(), 1);
        assert_eq!(
            response.itineraries[0].edge_ids().collect::<Vec<_>>(),
            vec![EdgeId(0), EdgeId(1)]
        );

        let missing = s
            .alternatives_avoiding(EdgeId(99), at(8, 0), PreferenceProfile::fastest())
            .await;
        assert_eq!(missing.status, RouteStatus::NotFound);
        assert_ne!(missing.request_id, response.request_id);
        assert_ne!(missing.request_id, RequestId(0));
    }

    #[tokio::test]
    async fn expansion_budget_reports_timeout_with_partial_set() {
        let mut engine = config(1, 8, 2000);
        engine.search.max_expansions = 1;
        let s = scheduler(abc(), &engine);

        let response = s.route(request(0, 2)).await;
        assert_eq!(response.status, RouteStatus::Timeout);
        assert!(response.stats.budget_exhausted);
        assert_eq!(response.itineraries.len(), 1);
        assert_eq!(response.itineraries[0].edge_ids().collect::<Vec<_>>(), vec![EdgeId(2)]);

        // Partial sets are not cached
        assert_eq!(s.route(request(0, 2)).await.status, RouteStatus::Timeout);
        assert_eq!(s.cache_hits(), 0);

        let unreachable = s.route(request(0, 3)).await;
        assert_eq!(unreachable.status, RouteStatus::NoRoute);
        assert!(unreachable.itineraries.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timeout_interrupts_long_search() {
        let mut engine = config(1, 8, 2000);
        engine.search.max_expansions = usize::MAX;
        let s = scheduler(grid(40), &engine);

        let started = Instant::now();
        let response = s
            .route(request(0, 40 * 40 - 1).with_timeout(Duration::from_millis(5)))
            .await;

        assert!(
            matches!(response.status, RouteStatus::Timeout | RouteStatus::NoRoute),
            "got {:?}",
            response.status
        );
        assert!(response.stats.interrupted);
        if response.status == RouteStatus::Timeout {
            assert!(!response.itineraries.is_empty());
        }
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn client_cancel_reports_cancelled() {
        let mut engine = config(1, 8, 60_000);
        engine.search.max_expansions = usize::MAX;
        let s = scheduler(grid(40), &engine);

        let ticket = s.submit(request(0, 40 * 40 - 1)).unwrap();
        ticket.cancel();
        let response = ticket.wait().await;

        assert_eq!(response.status, RouteStatus::Cancelled);
        assert!(response.itineraries.is_empty());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_requests() {
        let s = scheduler(abc(), &config(2, 8, 2000));
        assert!(s.route(request(0, 2)).await.is_ok());

        s.shutdown().await;
        assert!(matches!(
            s.submit(request(0, 2)),
            Err(SchedulerError::ShutDown { request_id: RequestId(2) })
        ));

        let rejected = s.route(request(0, 2)).await;
        assert_eq!(rejected.status, RouteStatus::Failed);
        assert_eq!(rejected.request_id, RequestId(3));
    }
}
