//! On-disk chunk store.
//!
//! A store directory holds the chunk texts (`chunks.json`), their vectors
//! (`index.json`), the index metadata (`metadata.json`) with a readable
//! summary (`metadata_summary.txt`) and any `backups/` of earlier builds.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use askcareer_embeddings::{Embedding, VectorIndex};

use crate::chunk::DocumentChunk;
use crate::error::{DocumentError, Result};

pub const CHUNKS_FILE: &str = "chunks.json";
pub const INDEX_FILE: &str = "index.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const SUMMARY_FILE: &str = "metadata_summary.txt";
pub const BACKUPS_DIR: &str = "backups";

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,

    /// Cosine similarity to the query, higher is closer.
    pub score: f32,
}

/// Chunks and their vectors, kept in memory and persisted as JSON.
#[derive(Debug)]
pub struct ChunkStore {
    root: PathBuf,
    chunks: BTreeMap<String, DocumentChunk>,
    index: VectorIndex,
}

impl ChunkStore {
    /// An empty store that will be written to `root`.
    pub fn create(root: impl Into<PathBuf>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            root: root.into(),
            chunks: BTreeMap::new(),
            index: VectorIndex::new(model, dimension),
        }
    }

    /// Whether a store has been written to `root`.
    pub fn exists(root: &Path) -> bool {
        root.join(CHUNKS_FILE).is_file() && root.join(INDEX_FILE).is_file()
    }

    /// Load the store persisted at `root`.
    pub async fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !Self::exists(&root) {
            return Err(DocumentError::StoreNotFound(root.display().to_string()));
        }

        let content = fs::read_to_string(root.join(CHUNKS_FILE)).await?;
        let chunks: Vec<DocumentChunk> = serde_json::from_str(&content)?;
        let index = VectorIndex::load(&root.join(INDEX_FILE)).await?;

        let mut store = Self {
            root,
            chunks: BTreeMap::new(),
            index,
        };
        for chunk in chunks {
            if store.index.contains(&chunk.id) {
                store.chunks.insert(chunk.id.clone(), chunk);
            } else {
                warn!("Chunk {} from {} has no vector, skipping", chunk.id, chunk.source());
            }
        }

        info!(
            "Loaded document index from {} ({} chunks, model {})",
            store.root.display(),
            store.chunks.len(),
            store.index.model()
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Embedding model the vectors were produced with.
    pub fn model(&self) -> &str {
        self.index.model()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Fail when queries embedded with `model` cannot be compared to this
    /// store's vectors.
    pub fn ensure_model(&self, model: &str) -> Result<()> {
        Ok(self.index.ensure_model(model)?)
    }

    pub fn insert(&mut self, chunk: DocumentChunk, embedding: Embedding) -> Result<()> {
        self.index.insert(chunk.id.clone(), embedding)?;
        self.chunks.insert(chunk.id.clone(), chunk);
        Ok(())
    }

    /// Drop every chunk that came from `source`, returning how many went.
    pub fn remove_source(&mut self, source: &str) -> usize {
        let removed: HashSet<String> = self
            .chunks
            .values()
            .filter(|chunk| chunk.source() == source)
            .map(|chunk| chunk.id.clone())
            .collect();

        self.chunks.retain(|id, _| !removed.contains(id));
        self.index.retain(|id| !removed.contains(id));
        debug!("Removed {} chunks of {source}", removed.len());
        removed.len()
    }

    pub fn get(&self, id: &str) -> Option<&DocumentChunk> {
        self.chunks.get(id)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &DocumentChunk> {
        self.chunks.values()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Distinct source paths, sorted.
    pub fn sources(&self) -> BTreeSet<String> {
        self.chunks
            .values()
            .map(|chunk| chunk.source().to_string())
            .collect()
    }

    /// The `k` chunks closest to `query`, best first.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let hits = self.index.search(query, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.chunks.get(&hit.id).map(|chunk| ScoredChunk {
                    chunk: chunk.clone(),
                    score: hit.score,
                })
            })
            .collect())
    }

    /// Write chunks and vectors to the store directory.
    pub async fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        let chunks: Vec<&DocumentChunk> = self.chunks.values().collect();
        let content = serde_json::to_string_pretty(&chunks)?;
        let path = self.root.join(CHUNKS_FILE);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &path).await?;

        self.index.save(&self.root.join(INDEX_FILE)).await?;
        debug!("Saved {} chunks to {}", self.chunks.len(), self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::HeaderMap;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn chunk(source: &str, ordinal: usize, content: &str) -> DocumentChunk {
        DocumentChunk::new(source, ordinal, content, HeaderMap::new())
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut store = ChunkStore::create(dir.path(), "test-model", 2);
        store.insert(chunk("a.md", 0, "alpha"), vec![1.0, 0.0]).unwrap();
        store.insert(chunk("b.md", 0, "beta"), vec![0.0, 1.0]).unwrap();
        store.save().await.unwrap();

        let loaded = ChunkStore::load(dir.path()).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.model(), "test-model");
        assert_eq!(
            loaded.sources().into_iter().collect::<Vec<_>>(),
            vec!["a.md", "b.md"]
        );
    }

    #[tokio::test]
    async fn test_load_missing_store() {
        let dir = TempDir::new().unwrap();
        let err = ChunkStore::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, DocumentError::StoreNotFound(_)));
    }

    #[test]
    fn test_similarity_search_ranks_closest_first() {
        let mut store = ChunkStore::create("unused", "test-model", 2);
        store.insert(chunk("a.md", 0, "alpha"), vec![1.0, 0.0]).unwrap();
        store.insert(chunk("b.md", 0, "beta"), vec![0.6, 0.8]).unwrap();
        store.insert(chunk("c.md", 0, "gamma"), vec![0.0, 1.0]).unwrap();

        let hits = store.similarity_search(&[0.0, 1.0], 2).unwrap();
        let contents: Vec<_> = hits.iter().map(|h| h.chunk.content.as_str()).collect();
        assert_eq!(contents, vec!["gamma", "beta"]);
    }

    #[test]
    fn test_remove_source_drops_vectors_too() {
        let mut store = ChunkStore::create("unused", "test-model", 2);
        store.insert(chunk("a.md", 0, "one"), vec![1.0, 0.0]).unwrap();
        store.insert(chunk("a.md", 1, "two"), vec![1.0, 0.1]).unwrap();
        store.insert(chunk("b.md", 0, "three"), vec![0.0, 1.0]).unwrap();

        assert_eq!(store.remove_source("a.md"), 2);
        assert_eq!(store.len(), 1);

        let hits = store.similarity_search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.content, "three");
    }

    #[test]
    fn test_wrong_dimension_is_rejected() {
        let mut store = ChunkStore::create("unused", "test-model", 3);
        assert!(store.insert(chunk("a.md", 0, "x"), vec![1.0]).is_err());
    }
}
