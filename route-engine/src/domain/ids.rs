//! Identifier types for network elements and requests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a stop or intersection in the transport graph.
///
/// # Examples
///
/// ```
/// use route_engine::domain::NodeId;
///
/// let id = NodeId(7);
/// assert_eq!(id.to_string(), "n7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

/// Identifier of a mode-tagged segment in the transport graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl From<u32> for EdgeId {
    fn from(id: u32) -> Self {
        EdgeId(id)
    }
}

/// Identifier assigned to a route request at admission.
///
/// Responses are matched to requests by this id, never by completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes() {
        assert_eq!(NodeId(3).to_string(), "n3");
        assert_eq!(EdgeId(12).to_string(), "e12");
        assert_eq!(RequestId(99).to_string(), "req-99");
    }

    #[test]
    fn ids_are_ordered_numerically() {
        let mut ids = vec![NodeId(10), NodeId(2), NodeId(7)];
        ids.sort();
        assert_eq!(ids, vec![NodeId(2), NodeId(7), NodeId(10)]);
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&EdgeId(4)).unwrap();
        assert_eq!(json, "4");

        let back: NodeId = serde_json::from_str("15").unwrap();
        assert_eq!(back, NodeId(15));
    }
}
