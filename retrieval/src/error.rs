//! Error types for the career assistant.

use thiserror::Error;

/// Result type alias for assistant operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while answering career questions.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// A credential the configured backend needs was not provided.
    #[error("missing required credential: {0} is not set")]
    MissingCredential(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Graph error.
    #[error("graph error: {0}")]
    Graph(#[from] askcareer_graph::GraphError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] askcareer_embeddings::EmbeddingError),

    /// Document index error.
    #[error("document error: {0}")]
    Document(#[from] askcareer_documents::DocumentError),

    /// TOML configuration could not be parsed.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
