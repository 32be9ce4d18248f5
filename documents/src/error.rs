//! Error types for document ingestion.

use thiserror::Error;

use askcareer_embeddings::EmbeddingError;

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur while loading, splitting or storing documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The data directory does not exist.
    #[error("data directory not found: {0}")]
    DataDirNotFound(String),

    /// The data directory holds no usable markdown.
    #[error("no markdown files found in {0}")]
    NoDocuments(String),

    /// No chunk store has been built at this location yet.
    #[error("no document index at {0}; run `askcareer ingest` first")]
    StoreNotFound(String),

    /// Splitter settings cannot work together.
    #[error("invalid splitter settings: {0}")]
    InvalidSplitter(String),

    /// The previous store could not be backed up.
    #[error("backup failed: {0}")]
    Backup(String),

    /// Embedding or vector index error.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
