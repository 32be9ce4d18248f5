//! Similarity search over the persisted chunk store.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use askcareer_documents::{ChunkMetadata, ChunkStore, ScoredChunk};
use askcareer_embeddings::EmbeddingProvider;

use crate::error::Result;

/// A chunk returned for a question.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub content: String,
    pub metadata: ChunkMetadata,

    /// Cosine similarity to the query.
    pub score: f32,
}

impl RetrievedDocument {
    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    /// The first `max_chars` characters of the content.
    pub fn snippet(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((end, _)) => &self.content[..end],
            None => &self.content,
        }
    }
}

impl From<ScoredChunk> for RetrievedDocument {
    fn from(scored: ScoredChunk) -> Self {
        Self {
            content: scored.chunk.content,
            metadata: scored.chunk.metadata,
            score: scored.score,
        }
    }
}

/// Embeds questions and looks up the nearest chunks.
#[derive(Clone)]
pub struct DocumentRetriever {
    store: Arc<ChunkStore>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl DocumentRetriever {
    /// Fails when the store was built with a different model than
    /// `provider`.
    pub fn new(store: Arc<ChunkStore>, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        store.ensure_model(provider.model())?;
        Ok(Self { store, provider })
    }

    /// Load the store persisted at `dir`.
    pub async fn open(dir: &Path, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let store = ChunkStore::load(dir).await?;
        Self::new(Arc::new(store), provider)
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// The `k` chunks most similar to `query`, best first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        if k == 0 || self.store.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.provider.embed(query).await?;
        let hits = self.store.similarity_search(&embedding, k)?;
        debug!("Retrieved {} of {} chunks for query", hits.len(), self.store.len());
        Ok(hits.into_iter().map(RetrievedDocument::from).collect())
    }
}

impl std::fmt::Debug for DocumentRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRetriever")
            .field("chunks", &self.store.len())
            .field("model", &self.provider.model())
            .finish()
    }
}

/// Full retrieved chunks with their source and headers, one block each.
pub fn format_document_context(documents: &[RetrievedDocument]) -> String {
    let mut lines = Vec::new();
    for document in documents {
        lines.push(format!("From {}", document.source()));
        if let Some(section) = document.metadata.header(1) {
            lines.push(format!("Section: {section}"));
        }
        if let Some(subsection) = document.metadata.header(2) {
            lines.push(format!("Subsection: {subsection}"));
        }
        lines.push(document.content.clone());
        lines.push("---".to_string());
    }
    lines.join("\n")
}
