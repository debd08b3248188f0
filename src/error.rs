//! Error types for the anomaly detector

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by graph construction, community detection and scoring
#[derive(Debug, Error)]
pub enum Error {
    /// Community detection algorithm name not recognised
    #[error("unknown algorithm '{name}', expected one of: {valid}")]
    UnknownAlgorithm {
        /// Name that was requested
        name: String,
        /// Comma separated list of accepted names
        valid: String,
    },

    /// Parameter outside its accepted range
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// Operation needs at least one node
    #[error("graph has no nodes")]
    EmptyGraph,

    /// Node index does not exist in the graph
    #[error("node {node} out of range for graph with {node_count} nodes")]
    NodeOutOfRange {
        node: u64,
        node_count: usize,
    },

    /// Per-node data does not line up with the node set
    #[error("{what} has {found} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
}
