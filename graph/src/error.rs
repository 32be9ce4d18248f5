//! Error types for graph access.

use thiserror::Error;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while querying the career graph.
///
/// A role or skill that is simply absent is not an error; queries return
/// `None` or an empty collection for it.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The database rejected a statement.
    #[error("graph query failed ({code}): {message}")]
    Query { code: String, message: String },

    /// The endpoint answered with something we could not interpret.
    #[error("invalid graph response: {0}")]
    InvalidResponse(String),

    /// Connection settings cannot be used.
    #[error("graph configuration error: {0}")]
    Config(String),

    /// The seed file for the in-memory graph is inconsistent.
    #[error("invalid graph seed: {0}")]
    InvalidSeed(String),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
