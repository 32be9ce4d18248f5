//! # Document Index
//!
//! Offline ingestion of the markdown knowledge base and the on-disk chunk
//! store the assistant searches at question time.
//!
//! ```text
//! data/**/*.md ──► loader ──► MarkdownHeaderSplitter ──► RecursiveCharacterSplitter
//!                                                               │
//!                               EmbeddingProvider ◄─────────────┘
//!                                      │
//!                                      ▼
//!         ChunkStore (chunks.json, index.json) + IndexMetadata (metadata.json)
//! ```
//!
//! ```rust,ignore
//! let ingestor = Ingestor::new("data", "rag/vector_store", provider);
//! let report = ingestor.run(IngestMode::Incremental).await?;
//! ```

pub mod chunk;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod metadata;
pub mod splitter;
pub mod store;

pub use chunk::{ChunkMetadata, DocumentChunk, HeaderMap};
pub use error::{DocumentError, Result};
pub use ingest::{IngestMode, IngestReport, Ingestor, backup_store, clear_store};
pub use loader::{SourceDocument, load_file, load_markdown, markdown_files};
pub use metadata::{ChunkStatistics, IndexMetadata, document_category};
pub use splitter::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DocumentSplitter, MarkdownHeaderSplitter,
    RecursiveCharacterSplitter, Section,
};
pub use store::{ChunkStore, ScoredChunk};
