//! # Embeddings
//!
//! Text embedding and nearest-neighbour lookup for the AskCareer document
//! index.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors with a local
//!   ONNX model, an OpenAI-compatible HTTP endpoint, or feature hashing
//! - **Similarity Search**: Rank stored chunk vectors against a query
//! - **Persistence**: Save and reload the vector index as JSON
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► VectorIndex               │
//! │       │                                   │                     │
//! │       ▼                                   ▼                     │
//! │  Http / Hashing                     top_k (cosine)             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod index;
pub mod local;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use index::{IndexEntry, VectorIndex};
pub use local::{FastEmbedProvider, local_model_dimension};
pub use provider::{EmbeddingProvider, HashingProvider, HttpEmbeddingProvider};
pub use similarity::{ScoredId, cosine_similarity, normalize, top_k};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Model the document index is built with unless configured otherwise.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Output dimension of [`DEFAULT_MODEL`].
pub const DEFAULT_DIMENSION: usize = 384;
