//! Traffic overlay configuration.

use chrono::Duration;
use serde::Deserialize;

/// Configuration for the traffic overlay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Width of a time bucket in minutes.
    pub bucket_mins: u32,

    /// Age after which a sample starts decaying toward free flow (minutes).
    pub staleness_window_mins: u32,
}

impl TrafficConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(bucket_mins: u32, staleness_window_mins: u32) -> Self {
        Self {
            bucket_mins,
            staleness_window_mins,
        }
    }

    /// Returns the staleness window as a Duration.
    pub fn staleness_window(&self) -> Duration {
        Duration::minutes(i64::from(self.staleness_window_mins))
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            bucket_mins: 15,
            staleness_window_mins: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TrafficConfig::default();

        assert_eq!(config.bucket_mins, 15);
        assert_eq!(config.staleness_window_mins, 30);
        assert_eq!(config.staleness_window(), Duration::minutes(30));
    }

    #[test]
    fn custom_config() {
        let config = TrafficConfig::new(5, 10);
        assert_eq!(config.bucket_mins, 5);
        assert_eq!(config.staleness_window(), Duration::minutes(10));
    }
}
