//! Decode errors and the crate-wide `Result` alias.

use std::io;

use serde_json::Value;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors raised while parsing queries, encoding graphs, or decoding results.
///
/// Confirmed-absent and unknown data are *not* errors; they are modelled as
/// result values. Everything here is fatal to the call that produced it.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// An array query carried more than one range `$key` at the same level.
    #[error("array query has more than one range key: {first} and {second}")]
    MultipleRangeQueries {
        /// Bounds of the range seen first.
        first: Value,
        /// Bounds of the conflicting range.
        second: Value,
    },
    /// A leaf query met a graph value it cannot materialise.
    #[error("unexpected graph shape for leaf query: {found}")]
    UnexpectedGraphShape {
        /// Short description of the offending graph value.
        found: String,
    },
    /// A reference path could not be followed through the snapshot.
    #[error("reference target {path} cannot be resolved")]
    UnsupportedReferenceTarget {
        /// Decoded path that failed.
        path: Value,
    },
    /// Following links exceeded the configured hop budget.
    #[error("reference chain through {path} exceeds {max} hops")]
    ReferenceDepthExceeded {
        /// Decoded path being resolved when the budget ran out.
        path: Value,
        /// Configured hop budget.
        max: usize,
    },
    /// The query JSON does not describe a valid query.
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// Human-readable description.
        reason: String,
    },
    /// Pagination bounds are contradictory or incomplete.
    #[error("invalid range bounds: {reason}")]
    InvalidBounds {
        /// Human-readable description.
        reason: String,
    },
    /// A key could not be encoded or decoded.
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Human-readable description.
        reason: String,
    },
    /// Provider-shaped JSON could not be turned into a node sequence.
    #[error("invalid graph: {reason}")]
    InvalidGraph {
        /// Human-readable description.
        reason: String,
    },
    /// Configuration file could not be parsed.
    #[error("config: {0}")]
    Config(String),
    /// I/O failure (CLI only).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DecodeError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::MultipleRangeQueries { .. } => "MultipleRangeQueries",
            DecodeError::UnexpectedGraphShape { .. } => "UnexpectedGraphShape",
            DecodeError::UnsupportedReferenceTarget { .. } => "UnsupportedReferenceTarget",
            DecodeError::ReferenceDepthExceeded { .. } => "ReferenceDepthExceeded",
            DecodeError::InvalidQuery { .. } => "InvalidQuery",
            DecodeError::InvalidBounds { .. } => "InvalidBounds",
            DecodeError::InvalidKey { .. } => "InvalidKey",
            DecodeError::InvalidGraph { .. } => "InvalidGraph",
            DecodeError::Config(_) => "Config",
            DecodeError::Io(_) => "Io",
            DecodeError::Json(_) => "Json",
        }
    }

    pub(crate) fn invalid_query(reason: impl Into<String>) -> Self {
        DecodeError::InvalidQuery {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_bounds(reason: impl Into<String>) -> Self {
        DecodeError::InvalidBounds {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_key(reason: impl Into<String>) -> Self {
        DecodeError::InvalidKey {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_graph(reason: impl Into<String>) -> Self {
        DecodeError::InvalidGraph {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn codes_are_stable() {
        let err = DecodeError::MultipleRangeQueries {
            first: json!({"$first": 2}),
            second: json!({"$last": 1}),
        };
        assert_eq!(err.code(), "MultipleRangeQueries");
        assert!(err.to_string().contains("$last"));
        assert_eq!(DecodeError::invalid_key("x").code(), "InvalidKey");
    }
}
