//! Engine configuration file.
//!
//! All sections are optional; anything omitted keeps its default.
//!
//! ```toml
//! [search]
//! max_expansions = 20000
//! fare_surcharges = { boda = 500.0 }
//!
//! [scheduler]
//! workers = 4
//! queue_depth = 32
//! request_timeout_ms = 1500
//!
//! [traffic]
//! bucket_mins = 15
//! staleness_window_mins = 30
//!
//! [cache]
//! ttl_secs = 30
//! max_capacity = 1000
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::planner::SearchConfig;
use crate::scheduler::SchedulerConfig;
use crate::traffic::TrafficConfig;

/// Error loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Configuration for every engine component.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub scheduler: SchedulerConfig,
    pub traffic: TrafficConfig,
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.workers == 0 {
            return Err(ConfigError::Invalid("scheduler.workers must be at least 1"));
        }
        if self.scheduler.queue_depth == 0 {
            return Err(ConfigError::Invalid("scheduler.queue_depth must be at least 1"));
        }
        if self.traffic.bucket_mins == 0 {
            return Err(ConfigError::Invalid("traffic.bucket_mins must be at least 1"));
        }
        if self.traffic.staleness_window_mins == 0 {
            return Err(ConfigError::Invalid(
                "traffic.staleness_window_mins must be at least 1",
            ));
        }
        if self.search.max_expansions == 0 {
            return Err(ConfigError::Invalid("search.max_expansions must be at least 1"));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid("search.max_results must be at least 1"));
        }
        if self.search.cancel_check_interval == 0 {
            return Err(ConfigError::Invalid(
                "search.cancel_check_interval must be at least 1",
            ));
        }
        if self
            .search
            .fare_surcharges
            .values()
            .any(|s| !s.is_finite() || *s < 0.0)
        {
            return Err(ConfigError::Invalid(
                "search.fare_surcharges must be finite and non-negative",
            ));
        }
        Ok(())
    }
}
