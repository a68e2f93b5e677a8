//! Domain error types.
//!
//! These errors represent construction failures for domain values. They are
//! distinct from graph validation and request-level errors.

use super::NodeId;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// The first leg does not start where the itinerary claims to start
    #[error("itinerary starts at {expected} but first leg departs {found}")]
    OriginMismatch { expected: NodeId, found: NodeId },

    /// Consecutive legs don't share a node
    #[error("legs are not contiguous: {0} does not connect to {1}")]
    NotContiguous(NodeId, NodeId),

    /// Preference weights are unusable
    #[error("invalid preference: {0}")]
    InvalidPreference(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::OriginMismatch {
            expected: NodeId(1),
            found: NodeId(2),
        };
        assert_eq!(
            err.to_string(),
            "itinerary starts at n1 but first leg departs n2"
        );

        let err = DomainError::NotContiguous(NodeId(3), NodeId(4));
        assert_eq!(
            err.to_string(),
            "legs are not contiguous: n3 does not connect to n4"
        );

        let err = DomainError::InvalidPreference("weights must be finite");
        assert_eq!(err.to_string(), "invalid preference: weights must be finite");
    }
}
