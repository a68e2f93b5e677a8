//! Search configuration for the route optimizer.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::Mode;

/// Configuration parameters for route search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of labels expanded before the search stops with
    /// whatever it has found.
    pub max_expansions: usize,

    /// Expansions between checks of the cancellation flag.
    pub cancel_check_interval: usize,

    /// Maximum number of itineraries to return.
    pub max_results: usize,

    /// Flat fare added to every edge of a mode.
    pub fare_surcharges: BTreeMap<Mode, f64>,
}

impl SearchConfig {
    /// Create a new configuration with the given parameters and no
    /// surcharges.
    pub fn new(max_expansions: usize, cancel_check_interval: usize, max_results: usize) -> Self {
        Self {
            max_expansions,
            cancel_check_interval,
            max_results,
            fare_surcharges: BTreeMap::new(),
        }
    }

    /// Add a per-mode fare surcharge.
    pub fn with_surcharge(mut self, mode: Mode, amount: f64) -> Self {
        self.fare_surcharges.insert(mode, amount);
        self
    }

    /// Surcharge for a mode (0 if none configured).
    pub fn surcharge(&self, mode: Mode) -> f64 {
        self.fare_surcharges.get(&mode).copied().unwrap_or(0.0)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_expansions: 50_000,
            cancel_check_interval: 64,
            max_results: 10,
            fare_surcharges: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SearchConfig::default();

        assert_eq!(config.max_expansions, 50_000);
        assert_eq!(config.cancel_check_interval, 64);
        assert_eq!(config.max_results, 10);
        assert!(config.fare_surcharges.is_empty());
    }

    #[test]
    fn custom_config() {
        let config = SearchConfig::new(100, 8, 3).with_surcharge(Mode::Boda, 500.0);

        assert_eq!(config.max_expansions, 100);
        assert_eq!(config.cancel_check_interval, 8);
        assert_eq!(config.max_results, 3);
        assert_eq!(config.surcharge(Mode::Boda), 500.0);
        assert_eq!(config.surcharge(Mode::Bus), 0.0);
    }
}
