use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use route_engine::config::{ConfigError, EngineConfig};
use route_engine::domain::{EdgeId, Mode, NodeId, PreferenceProfile, TimeBucket};
use route_engine::graph::{
    DatasetError, GraphDataset, GraphHandle, ValidationError, kampala_network,
};
use route_engine::planner::{CancelFlag, RouteError, RouteOptimizer, plan_tour};
use route_engine::scheduler::{RequestScheduler, RouteRequest};
use route_engine::traffic::{TrafficError, TrafficState};

#[derive(Debug, Parser)]
#[command(name = "route-engine", about = "Multi-modal route planning")]
struct Cli {
    /// Graph dataset (JSON). Uses the built-in Kampala network if omitted.
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Engine configuration (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Congestion to apply before routing, as EDGE=MULTIPLIER. Applies to
    /// the time bucket of the departure. May be repeated.
    #[arg(long = "congest", value_parser = parse_congestion, global = true)]
    congestion: Vec<(EdgeId, f64)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find itineraries between two nodes.
    Route {
        origin: u32,
        destination: u32,

        #[arg(long, value_enum, default_value_t = Prefer::Balanced)]
        prefer: Prefer,

        /// Departure time (RFC 3339). Defaults to now.
        #[arg(long)]
        depart: Option<DateTime<Utc>>,

        /// Restrict to these modes (comma separated).
        #[arg(long, value_delimiter = ',')]
        modes: Vec<Mode>,

        /// Edges the route must not use (comma separated).
        #[arg(long, value_delimiter = ',')]
        avoid: Vec<u32>,

        /// Also try departing this many minutes later (comma separated).
        #[arg(long, value_delimiter = ',')]
        offsets: Vec<u32>,

        /// Give up after this many milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Route many requests read from a JSON array.
    Batch { requests: PathBuf },

    /// Routes around a congested edge between its two ends.
    Alternatives {
        edge: u32,

        #[arg(long, value_enum, default_value_t = Prefer::Balanced)]
        prefer: Prefer,

        #[arg(long)]
        depart: Option<DateTime<Utc>>,
    },

    /// Visit several stops in greedy nearest-first order.
    Tour {
        start: u32,
        #[arg(required = true)]
        stops: Vec<u32>,

        #[arg(long, value_enum, default_value_t = Prefer::Balanced)]
        prefer: Prefer,

        #[arg(long)]
        depart: Option<DateTime<Utc>>,
    },

    /// List the nodes of the graph.
    Nodes,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Prefer {
    Fastest,
    Cheapest,
    FewestTransfers,
    Balanced,
}

impl From<Prefer> for PreferenceProfile {
    fn from(prefer: Prefer) -> Self {
        match prefer {
            Prefer::Fastest => PreferenceProfile::fastest(),
            Prefer::Cheapest => PreferenceProfile::cheapest(),
            Prefer::FewestTransfers => PreferenceProfile::fewest_transfers(),
            Prefer::Balanced => PreferenceProfile::balanced(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Graph(#[from] ValidationError),

    #[error(transparent)]
    Traffic(#[from] TrafficError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn parse_congestion(s: &str) -> Result<(EdgeId, f64), String> {
    let (edge, multiplier) = s
        .split_once('=')
        .ok_or_else(|| format!("expected EDGE=MULTIPLIER, got {s:?}"))?;
    let edge = edge
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad edge id {edge:?}: {e}"))?;
    let multiplier = multiplier
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad multiplier {multiplier:?}: {e}"))?;
    Ok((EdgeId(edge), multiplier))
}

/// Distinct traffic buckets the requests depart in.
fn departure_buckets(requests: &[RouteRequest], bucket_mins: u32) -> BTreeSet<TimeBucket> {
    requests
        .iter()
        .map(|r| TimeBucket::of(r.departure_time, bucket_mins))
        .collect()
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };

    let dataset = match &cli.graph {
        Some(path) => GraphDataset::from_path(path)?,
        None => kampala_network(),
    };
    let graph = Arc::new(GraphHandle::load(dataset)?);
    let traffic = Arc::new(TrafficState::new(config.traffic.clone()));
    info!(
        nodes = graph.current().node_count(),
        edges = graph.current().edge_count(),
        "graph loaded"
    );

    let congest_bucket = |bucket: TimeBucket| -> Result<(), CliError> {
        for (edge, multiplier) in &cli.congestion {
            traffic.update(*edge, bucket, *multiplier)?;
        }
        Ok(())
    };
    let congest = |at: DateTime<Utc>| congest_bucket(TimeBucket::of(at, config.traffic.bucket_mins));

    match cli.command {
        Command::Route {
            origin,
            destination,
            prefer,
            depart,
            modes,
            avoid,
            offsets,
            timeout_ms,
        } => {
            let depart = depart.unwrap_or_else(Utc::now);
            congest(depart)?;

            let mut request =
                RouteRequest::new(NodeId(origin), NodeId(destination), depart, prefer.into())
                    .avoiding(avoid.into_iter().map(EdgeId))
                    .with_offsets(offsets);
            if !modes.is_empty() {
                request = request.with_modes(modes);
            }
            request.timeout_ms = timeout_ms;

            let scheduler = RequestScheduler::start(graph, traffic.clone(), &config);
            let response = scheduler.route(request).await;
            scheduler.shutdown().await;
            print_json(&response)
        }

        Command::Batch { requests } => {
            let text = std::fs::read_to_string(&requests).map_err(|source| CliError::Io {
                path: requests.clone(),
                source,
            })?;
            let requests: Vec<RouteRequest> = serde_json::from_str(&text)?;
            for bucket in departure_buckets(&requests, config.traffic.bucket_mins) {
                congest_bucket(bucket)?;
            }

            let scheduler = RequestScheduler::start(graph, traffic.clone(), &config);
            let responses = scheduler.route_batch(requests).await;
            scheduler.shutdown().await;
            print_json(&responses)
        }

        Command::Alternatives {
            edge,
            prefer,
            depart,
        } => {
            let depart = depart.unwrap_or_else(Utc::now);
            congest(depart)?;

            let scheduler = RequestScheduler::start(graph, traffic.clone(), &config);
            let response = scheduler
                .alternatives_avoiding(EdgeId(edge), depart, prefer.into())
                .await;
            scheduler.shutdown().await;
            print_json(&response)
        }

        Command::Tour {
            start,
            stops,
            prefer,
            depart,
        } => {
            let depart = depart.unwrap_or_else(Utc::now);
            congest(depart)?;

            let graph = graph.current();
            let snapshot = traffic.snapshot(Utc::now());
            let optimizer = RouteOptimizer::new(&graph, &snapshot, &config.search);
            let stops: Vec<NodeId> = stops.into_iter().map(NodeId).collect();
            let tour = plan_tour(
                &optimizer,
                NodeId(start),
                &stops,
                depart,
                &prefer.into(),
                &CancelFlag::new(),
            )?;
            print_json(&tour)
        }

        Command::Nodes => print_json(&graph.current().nodes()),
    }
}
