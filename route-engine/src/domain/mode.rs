//! Travel mode tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid mode: {0:?} (expected walk, bus, matatu or boda)")]
pub struct InvalidMode(String);

/// The way a segment of the network is travelled.
///
/// Every edge carries exactly one mode. Consecutive edges with different
/// modes count as a transfer.
///
/// # Examples
///
/// ```
/// use route_engine::domain::Mode;
///
/// let mode: Mode = "matatu".parse().unwrap();
/// assert_eq!(mode, Mode::Matatu);
/// assert!("tram".parse::<Mode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// On foot.
    Walk,
    /// Scheduled or hail-stop bus.
    Bus,
    /// Shared minibus taxi.
    Matatu,
    /// Motorcycle taxi.
    Boda,
}

impl Mode {
    /// All modes, in declaration order.
    pub const ALL: [Mode; 4] = [Mode::Walk, Mode::Bus, Mode::Matatu, Mode::Boda];

    /// Returns the lowercase name used in datasets and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Walk => "walk",
            Mode::Bus => "bus",
            Mode::Matatu => "matatu",
            Mode::Boda => "boda",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "walk" => Ok(Mode::Walk),
            "bus" => Ok(Mode::Bus),
            "matatu" | "taxi" => Ok(Mode::Matatu),
            "boda" => Ok(Mode::Boda),
            other => Err(InvalidMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for mode in Mode::ALL {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn taxi_alias() {
        assert_eq!("taxi".parse::<Mode>().unwrap(), Mode::Matatu);
    }

    #[test]
    fn reject_unknown() {
        let err = "Bus".parse::<Mode>().unwrap_err();
        assert!(err.to_string().contains("\"Bus\""));
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Boda).unwrap(), "\"boda\"");
        let m: Mode = serde_json::from_str("\"walk\"").unwrap();
        assert_eq!(m, Mode::Walk);
    }
}
