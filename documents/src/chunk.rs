//! Chunks of source text as stored in the document index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header hierarchy of a chunk, keyed `Header 1` to `Header 3`.
pub type HeaderMap = BTreeMap<String, String>;

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path of the source markdown file.
    pub source: String,

    /// Markdown headers enclosing the chunk.
    #[serde(default)]
    pub headers: HeaderMap,

    /// Length of the content in characters.
    pub chunk_size: usize,
}

impl ChunkMetadata {
    /// The enclosing header at `level` (1 to 3), if any.
    pub fn header(&self, level: u8) -> Option<&str> {
        self.headers.get(&format!("Header {level}")).map(String::as_str)
    }
}

/// A span of source text plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Stable id derived from the source path and the chunk's position.
    pub id: String,

    pub content: String,

    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    /// Create the `ordinal`-th chunk of `source`.
    pub fn new(
        source: impl Into<String>,
        ordinal: usize,
        content: impl Into<String>,
        headers: HeaderMap,
    ) -> Self {
        let source = source.into();
        let content = content.into();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("{source}#{ordinal}").as_bytes());

        Self {
            id: id.to_string(),
            metadata: ChunkMetadata {
                source,
                headers,
                chunk_size: content.chars().count(),
            },
            content,
        }
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_are_stable_per_position() {
        let a = DocumentChunk::new("data/roles/bi.md", 0, "text", HeaderMap::new());
        let b = DocumentChunk::new("data/roles/bi.md", 0, "other text", HeaderMap::new());
        let c = DocumentChunk::new("data/roles/bi.md", 1, "text", HeaderMap::new());

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_chunk_size_counts_characters() {
        let chunk = DocumentChunk::new("a.md", 0, "Données", HeaderMap::new());
        assert_eq!(chunk.metadata.chunk_size, 7);
    }

    #[test]
    fn test_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("Header 2".to_string(), "Skills".to_string());
        let chunk = DocumentChunk::new("a.md", 0, "SQL", headers);

        assert_eq!(chunk.metadata.header(2), Some("Skills"));
        assert_eq!(chunk.metadata.header(1), None);
    }
}
