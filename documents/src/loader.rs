//! Markdown discovery and loading.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{DocumentError, Result};

/// A markdown file read from the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path of the file as found under the data directory.
    pub source: String,

    pub content: String,

    /// Last modification time, when the platform reports one.
    pub modified: Option<DateTime<Utc>>,
}

impl SourceDocument {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            modified: None,
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

/// Every `*.md` file below `data_dir`, sorted by path.
pub fn markdown_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Err(DocumentError::DataDirNotFound(data_dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(data_dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            files.push(entry.into_path());
        }
    }

    debug!("Found {} markdown files in {}", files.len(), data_dir.display());
    Ok(files)
}

/// Read a single markdown file.
pub async fn load_file(path: &Path) -> Result<SourceDocument> {
    let content = fs::read_to_string(path).await?;
    let modified = fs::metadata(path)
        .await
        .ok()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from);

    Ok(SourceDocument {
        source: path.display().to_string(),
        content,
        modified,
    })
}

/// Load the given files, skipping any that cannot be read as UTF-8 text.
pub async fn load_files(paths: &[PathBuf]) -> Vec<SourceDocument> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match load_file(path).await {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!("Failed to load {}: {e}", path.display()),
        }
    }
    documents
}

/// Load every markdown file below `data_dir`.
///
/// Fails when the directory is missing or yields no documents.
pub async fn load_markdown(data_dir: &Path) -> Result<Vec<SourceDocument>> {
    info!("Loading documents from {}", data_dir.display());

    let files = markdown_files(data_dir)?;
    if files.is_empty() {
        return Err(DocumentError::NoDocuments(data_dir.display().to_string()));
    }

    let documents = load_files(&files).await;
    if documents.is_empty() {
        return Err(DocumentError::NoDocuments(data_dir.display().to_string()));
    }

    info!("Loaded {} documents", documents.len());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_nested_markdown_only() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("roles")).unwrap();
        std::fs::write(dir.path().join("roles/data_engineer.md"), "# Data Engineer").unwrap();
        std::fs::write(dir.path().join("intro.md"), "Hello").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = load_markdown(dir.path()).await.unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|d| {
                Path::new(&d.source)
                    .strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();

        assert_eq!(names, vec!["intro.md", "roles/data_engineer.md"]);
        assert!(docs.iter().all(|d| d.modified.is_some()));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = load_markdown(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, DocumentError::DataDirNotFound(_)));
    }

    #[tokio::test]
    async fn test_directory_without_markdown() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let err = load_markdown(dir.path()).await.unwrap_err();
        assert!(matches!(err, DocumentError::NoDocuments(_)));
    }
}
