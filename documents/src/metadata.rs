//! Description of a built document index.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;
use crate::splitter::{HEADERS_TO_SPLIT_ON, RecursiveCharacterSplitter};
use crate::store::{ChunkStore, METADATA_FILE, SUMMARY_FILE};

/// Category of a source document, inferred from its path.
pub fn document_category(source: &str) -> Option<&'static str> {
    ["roles", "skills", "learning_paths"]
        .into_iter()
        .find(|category| source.contains(category))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStatistics {
    /// Mean chunk length in characters, rounded to two decimals.
    pub average_size: f64,
    pub min_size: usize,
    pub max_size: usize,
    pub total_chunks: usize,
}

impl ChunkStatistics {
    pub fn from_sizes(sizes: impl IntoIterator<Item = usize>) -> Self {
        let sizes: Vec<usize> = sizes.into_iter().collect();
        if sizes.is_empty() {
            return Self::default();
        }

        let total: usize = sizes.iter().sum();
        let average = total as f64 / sizes.len() as f64;
        Self {
            average_size: (average * 100.0).round() / 100.0,
            min_size: sizes.iter().copied().min().unwrap_or_default(),
            max_size: sizes.iter().copied().max().unwrap_or_default(),
            total_chunks: sizes.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParameters {
    pub headers_to_split_on: Vec<(String, String)>,
    pub separators: Vec<String>,
}

/// Written next to the chunk store after every build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub total_documents: usize,

    /// Document counts per inferred category.
    pub document_types: BTreeMap<String, usize>,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunk_statistics: ChunkStatistics,
    pub embedding_model: String,

    /// Source paths, sorted.
    pub document_sources: Vec<String>,

    /// When the index was last written. Incremental builds pick up files
    /// modified after this instant.
    pub creation_timestamp: DateTime<Utc>,

    pub vector_store_path: String,
    pub processing_parameters: ProcessingParameters,
}

impl IndexMetadata {
    /// Describe the current contents of `store`.
    pub fn describe(
        store: &ChunkStore,
        splitter: &RecursiveCharacterSplitter,
        created: DateTime<Utc>,
    ) -> Self {
        let sources = store.sources();

        let mut document_types = BTreeMap::new();
        for category in sources.iter().filter_map(|s| document_category(s.as_str())) {
            *document_types.entry(category.to_string()).or_insert(0) += 1;
        }

        Self {
            total_documents: sources.len(),
            document_types,
            chunk_size: splitter.chunk_size(),
            chunk_overlap: splitter.chunk_overlap(),
            chunk_statistics: ChunkStatistics::from_sizes(
                store.chunks().map(|c| c.content.chars().count()),
            ),
            embedding_model: store.model().to_string(),
            document_sources: sources.into_iter().collect(),
            creation_timestamp: created,
            vector_store_path: store.root().display().to_string(),
            processing_parameters: ProcessingParameters {
                headers_to_split_on: HEADERS_TO_SPLIT_ON
                    .iter()
                    .map(|(marker, key)| ((*marker).to_string(), (*key).to_string()))
                    .collect(),
                separators: splitter.separators().to_vec(),
            },
        }
    }

    /// Metadata of the store at `root`, if one was written.
    pub async fn read(root: &Path) -> Result<Option<Self>> {
        let path = root.join(METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write `metadata.json` and `metadata_summary.txt` under `root`.
    pub async fn write(&self, root: &Path) -> Result<()> {
        fs::create_dir_all(root).await?;
        fs::write(root.join(METADATA_FILE), serde_json::to_string_pretty(self)?).await?;
        fs::write(root.join(SUMMARY_FILE), self.summary()).await?;
        Ok(())
    }

    /// Human-readable rendering.
    pub fn summary(&self) -> String {
        let stats = &self.chunk_statistics;
        let mut out = String::new();
        let _ = writeln!(out, "Vector Store Summary");
        let _ = writeln!(out, "===================\n");
        let _ = writeln!(out, "Created: {}", self.creation_timestamp.to_rfc3339());
        let _ = writeln!(out, "Total Documents: {}", self.total_documents);
        let _ = writeln!(out, "\nDocument Types:");
        for (category, count) in &self.document_types {
            let _ = writeln!(out, "- {category}: {count}");
        }
        let _ = writeln!(out, "\nChunk Statistics:");
        let _ = writeln!(out, "- Average Size: {} characters", stats.average_size);
        let _ = writeln!(out, "- Min Size: {} characters", stats.min_size);
        let _ = writeln!(out, "- Max Size: {} characters", stats.max_size);
        let _ = writeln!(out, "- Total Chunks: {}", stats.total_chunks);
        let _ = writeln!(out, "\nEmbedding Model: {}", self.embedding_model);
        let _ = writeln!(out, "\nDocument Sources:");
        for source in &self.document_sources {
            let _ = writeln!(out, "- {source}");
        }
        out
    }
}
