//! Persisted vector index for chunk lookups.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{ScoredId, normalize, top_k};

/// An entry in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Identifier of the chunk this vector belongs to.
    pub id: String,

    /// The embedding vector (normalized).
    pub embedding: Embedding,
}

/// On-disk layout of the index.
#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// A flat vector index searched by cosine similarity.
///
/// Vectors are normalized on insert. Every vector must have the dimension
/// the index was created with, and the index remembers which model produced
/// them so a query embedded with another model can be refused.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    /// Model that produced the stored vectors.
    model: String,

    /// Expected dimension of embeddings.
    dimension: usize,

    /// Stored entries keyed by id.
    entries: BTreeMap<String, IndexEntry>,
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
            entries: BTreeMap::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert or replace a vector.
    pub fn insert(&mut self, id: impl Into<String>, mut embedding: Embedding) -> Result<()> {
        let id = id.into();
        self.check_dimension(embedding.len())?;
        normalize(&mut embedding);

        debug!("Indexed vector for chunk {id}");
        self.entries.insert(id.clone(), IndexEntry { id, embedding });
        Ok(())
    }

    /// Keep only the entries whose id satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|id, _| keep(id.as_str()));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `k` entries most similar to `query`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        self.check_dimension(query.len())?;

        let mut query = query.to_vec();
        normalize(&mut query);

        let candidates = self
            .entries
            .values()
            .map(|e| (e.id.as_str(), e.embedding.as_slice()));
        top_k(&query, candidates, k)
    }

    /// Fail unless vectors for this index come from `model`.
    pub fn ensure_model(&self, model: &str) -> Result<()> {
        if self.model != model {
            return Err(EmbeddingError::ModelMismatch {
                index_model: self.model.clone(),
                provider_model: model.to_string(),
            });
        }
        Ok(())
    }

    /// Serialize the index to JSON.
    pub fn to_json(&self) -> Result<String> {
        let persisted = PersistedIndex {
            model: self.model.clone(),
            dimension: self.dimension,
            entries: self.entries.values().cloned().collect(),
        };
        Ok(serde_json::to_string(&persisted)?)
    }

    /// Load an index from JSON, validating every vector's dimension.
    pub fn from_json(json: &str) -> Result<Self> {
        let persisted: PersistedIndex = serde_json::from_str(json)?;

        let mut index = Self::new(persisted.model, persisted.dimension);
        for entry in persisted.entries {
            index.check_dimension(entry.embedding.len())?;
            index.entries.insert(entry.id.clone(), entry);
        }
        Ok(index)
    }

    /// Write the index to `path`, replacing any previous file atomically.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, self.to_json()?).await?;
        fs::rename(&temp_path, path).await?;

        info!("Saved {} vectors to {}", self.len(), path.display());
        Ok(())
    }

    /// Read an index previously written by [`VectorIndex::save`].
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let index = Self::from_json(&content)?;
        info!("Loaded {} vectors from {}", index.len(), path.display());
        Ok(index)
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}
