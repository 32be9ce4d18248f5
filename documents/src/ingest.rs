//! Building and refreshing the document index.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, Utc};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use askcareer_embeddings::EmbeddingProvider;

use crate::error::{DocumentError, Result};
use crate::loader::{SourceDocument, load_files, load_markdown, markdown_files};
use crate::metadata::IndexMetadata;
use crate::splitter::{DocumentSplitter, RecursiveCharacterSplitter};
use crate::store::{BACKUPS_DIR, ChunkStore};

/// Chunks sent to the embedding provider per request.
const EMBED_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Back up and discard the existing index, then rebuild from scratch.
    Full,

    /// Re-embed only files that are new or changed since the last build.
    Incremental,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Mode that actually ran. An incremental request without a previous
    /// index runs as a full build.
    pub mode: IngestMode,

    /// Documents split and embedded in this run.
    pub documents: usize,

    /// Chunks added in this run.
    pub chunks: usize,

    /// Previously indexed documents whose files no longer exist.
    pub removed: usize,

    /// Chunks in the store afterwards.
    pub total_chunks: usize,

    /// Where the previous index was copied to, for full builds.
    pub backup: Option<PathBuf>,
}

/// Turns a directory of markdown into a persisted [`ChunkStore`].
pub struct Ingestor {
    data_dir: PathBuf,
    store_dir: PathBuf,
    splitter: DocumentSplitter,
    provider: Arc<dyn EmbeddingProvider>,
}

impl Ingestor {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        store_dir: impl Into<PathBuf>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            store_dir: store_dir.into(),
            splitter: DocumentSplitter::default(),
            provider,
        }
    }

    pub fn with_splitter(mut self, splitter: RecursiveCharacterSplitter) -> Self {
        self.splitter = DocumentSplitter::new(splitter);
        self
    }

    pub async fn run(&self, mode: IngestMode) -> Result<IngestReport> {
        info!(
            "Ingesting {} into {} ({mode:?}, model {})",
            self.data_dir.display(),
            self.store_dir.display(),
            self.provider.model()
        );

        let report = match mode {
            IngestMode::Full => self.full().await?,
            IngestMode::Incremental => self.incremental().await?,
        };

        info!(
            "Ingestion finished: {} documents, {} new chunks, {} total",
            report.documents, report.chunks, report.total_chunks
        );
        Ok(report)
    }

    async fn full(&self) -> Result<IngestReport> {
        // Fail on a bad data directory before touching the existing index.
        let documents = load_markdown(&self.data_dir).await?;

        let backup = backup_store(&self.store_dir).await?;
        clear_store(&self.store_dir).await?;

        let mut store = ChunkStore::create(
            &self.store_dir,
            self.provider.model(),
            self.provider.dimension(),
        );
        let chunks = self.add_documents(&mut store, &documents).await?;
        self.persist(&store).await?;

        Ok(IngestReport {
            mode: IngestMode::Full,
            documents: documents.len(),
            chunks,
            removed: 0,
            total_chunks: store.len(),
            backup,
        })
    }

    async fn incremental(&self) -> Result<IngestReport> {
        let metadata = IndexMetadata::read(&self.store_dir).await?;
        let Some(metadata) = metadata.filter(|_| ChunkStore::exists(&self.store_dir)) else {
            info!("No previous index found, running a full build");
            return self.full().await;
        };

        let mut store = ChunkStore::load(&self.store_dir).await?;
        store.ensure_model(self.provider.model())?;

        let known = store.sources();
        let since = metadata.creation_timestamp;
        let files = markdown_files(&self.data_dir)?;

        let present: BTreeSet<String> = files.iter().map(|p| p.display().to_string()).collect();
        let mut removed = 0;
        for source in known.difference(&present) {
            let chunks = store.remove_source(source);
            info!("Dropped {chunks} chunks of deleted document {source}");
            removed += 1;
        }

        let changed: Vec<SourceDocument> = load_files(&files)
            .await
            .into_iter()
            .filter(|doc| !known.contains(&doc.source) || doc.modified.is_some_and(|m| m > since))
            .collect();

        if changed.is_empty() {
            if removed > 0 {
                self.persist(&store).await?;
            } else {
                info!("No new or modified documents found");
            }
            return Ok(IngestReport {
                mode: IngestMode::Incremental,
                documents: 0,
                chunks: 0,
                removed,
                total_chunks: store.len(),
                backup: None,
            });
        }

        for doc in &changed {
            store.remove_source(&doc.source);
        }
        let chunks = self.add_documents(&mut store, &changed).await?;
        self.persist(&store).await?;

        Ok(IngestReport {
            mode: IngestMode::Incremental,
            documents: changed.len(),
            chunks,
            removed,
            total_chunks: store.len(),
            backup: None,
        })
    }

    async fn add_documents(
        &self,
        store: &mut ChunkStore,
        documents: &[SourceDocument],
    ) -> Result<usize> {
        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|doc| self.splitter.split(doc))
            .collect();
        if chunks.is_empty() {
            warn!("No chunks created from {} documents", documents.len());
            return Ok(0);
        }
        info!(
            "Created {} chunks from {} documents",
            chunks.len(),
            documents.len()
        );

        let added = chunks.len();
        let mut pending = chunks.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<_> = pending.by_ref().take(EMBED_BATCH_SIZE).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.provider.embed_batch(&texts).await?;
            for (chunk, embedding) in batch.into_iter().zip(embeddings) {
                store.insert(chunk, embedding)?;
            }
            debug!("Embedded batch of {} chunks", texts.len());
        }
        Ok(added)
    }

    async fn persist(&self, store: &ChunkStore) -> Result<()> {
        store.save().await?;
        IndexMetadata::describe(store, self.splitter.text_splitter(), Utc::now())
            .write(store.root())
            .await
    }
}

/// Copy everything in `store_dir` except `backups/` into
/// `backups/backup_YYYYMMDD_HHMMSS`.
///
/// The copy is assembled in a temporary directory and renamed into place,
/// so a backup directory is always complete. Returns `None` when there is
/// nothing to back up.
pub async fn backup_store(store_dir: &Path) -> Result<Option<PathBuf>> {
    let items = store_items(store_dir).await?;
    if items.is_empty() {
        info!("No existing document index to back up");
        return Ok(None);
    }

    let backups = store_dir.join(BACKUPS_DIR);
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let temp = backups.join(format!("temp_{stamp}"));
    let mut target = backups.join(format!("backup_{stamp}"));
    let mut attempt = 1;
    while target.exists() {
        target = backups.join(format!("backup_{stamp}_{attempt}"));
        attempt += 1;
    }

    fs::create_dir_all(&temp).await?;
    if let Err(e) = copy_items(&items, &temp).await {
        if let Err(cleanup) = fs::remove_dir_all(&temp).await {
            warn!("Failed to remove {}: {cleanup}", temp.display());
        }
        return Err(DocumentError::Backup(format!("{}: {e}", temp.display())));
    }
    fs::rename(&temp, &target).await?;

    info!("Created backup at {}", target.display());
    Ok(Some(target))
}

/// Remove everything in `store_dir` except `backups/`.
pub async fn clear_store(store_dir: &Path) -> Result<()> {
    for item in store_items(store_dir).await? {
        if item.is_dir() {
            fs::remove_dir_all(&item).await?;
        } else {
            fs::remove_file(&item).await?;
        }
    }
    fs::create_dir_all(store_dir).await?;
    debug!("Cleared {}", store_dir.display());
    Ok(())
}

async fn store_items(store_dir: &Path) -> Result<Vec<PathBuf>> {
    if !store_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    let mut entries = fs::read_dir(store_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name() != BACKUPS_DIR {
            items.push(entry.path());
        }
    }
    items.sort();
    Ok(items)
}

async fn copy_items(items: &[PathBuf], dest: &Path) -> Result<()> {
    for item in items {
        let Some(parent) = item.parent() else {
            continue;
        };
        for entry in WalkDir::new(item) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(parent)
                .map_err(|e| DocumentError::Backup(e.to_string()))?;
            let target = dest.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).await?;
            } else {
                fs::copy(entry.path(), &target).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CHUNKS_FILE, METADATA_FILE, SUMMARY_FILE};
    use askcareer_embeddings::HashingProvider;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn provider() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashingProvider::new(64))
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Push a file's mtime past any build that just finished.
    fn touch_later(dir: &Path, name: &str) {
        let file = std::fs::File::options()
            .write(true)
            .open(dir.join(name))
            .unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_build_writes_store_and_metadata() {
        let data = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        write(data.path(), "roles/data_engineer.md", "# Data Engineer\n## Skills\nSQL, Python");
        write(data.path(), "skills/sql.md", "# SQL\nQuerying relational data.");

        let report = Ingestor::new(data.path(), store_dir.path(), provider())
            .run(IngestMode::Full)
            .await
            .unwrap();

        assert_eq!(report.mode, IngestMode::Full);
        assert_eq!(report.documents, 2);
        assert_eq!(report.chunks, 2);
        assert!(report.backup.is_none());

        for file in [CHUNKS_FILE, METADATA_FILE, SUMMARY_FILE] {
            assert!(store_dir.path().join(file).is_file(), "{file} missing");
        }
        let metadata = IndexMetadata::read(store_dir.path()).await.unwrap().unwrap();
        assert_eq!(metadata.embedding_model, HashingProvider::MODEL);
        assert_eq!(metadata.total_documents, 2);
    }

    #[tokio::test]
    async fn test_second_full_build_backs_up_the_first() {
        let data = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        write(data.path(), "roles/bi.md", "# BI Engineer\nDashboards.");

        let ingestor = Ingestor::new(data.path(), store_dir.path(), provider());
        ingestor.run(IngestMode::Full).await.unwrap();
        let report = ingestor.run(IngestMode::Full).await.unwrap();

        let backup = report.backup.unwrap();
        assert!(backup.starts_with(store_dir.path().join(BACKUPS_DIR)));
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("backup_")
        );
        assert!(backup.join(CHUNKS_FILE).is_file());
        assert!(!backup.join(BACKUPS_DIR).exists());
        assert!(store_dir.path().join(CHUNKS_FILE).is_file());
    }

    #[tokio::test]
    async fn test_full_build_fails_without_documents() {
        let data = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();

        let err = Ingestor::new(data.path(), store_dir.path(), provider())
            .run(IngestMode::Full)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NoDocuments(_)));
    }

    #[tokio::test]
    async fn test_incremental_without_index_runs_full() {
        let data = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        write(data.path(), "roles/bi.md", "# BI Engineer\nDashboards.");

        let report = Ingestor::new(data.path(), store_dir.path(), provider())
            .run(IngestMode::Incremental)
            .await
            .unwrap();
        assert_eq!(report.mode, IngestMode::Full);
        assert_eq!(report.documents, 1);
    }

    #[tokio::test]
    async fn test_incremental_picks_up_new_and_changed_files() {
        let data = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        write(data.path(), "roles/bi.md", "# BI Engineer\nDashboards.");
        write(data.path(), "roles/de.md", "# Data Engineer\nPipelines.");

        let ingestor = Ingestor::new(data.path(), store_dir.path(), provider());
        ingestor.run(IngestMode::Full).await.unwrap();

        let report = ingestor.run(IngestMode::Incremental).await.unwrap();
        assert_eq!(report.documents, 0);
        assert_eq!(report.total_chunks, 2);

        write(data.path(), "roles/de.md", "# Data Engineer\nPipelines.\n\n## Tools\nAirflow.");
        touch_later(data.path(), "roles/de.md");
        write(data.path(), "skills/python.md", "# Python\nScripting.");

        let report = ingestor.run(IngestMode::Incremental).await.unwrap();
        assert_eq!(report.mode, IngestMode::Incremental);
        assert_eq!(report.documents, 2);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.total_chunks, 4);

        let store = ChunkStore::load(store_dir.path()).await.unwrap();
        let contents: Vec<_> = store.chunks().map(|c| c.content.as_str()).collect();
        assert!(contents.contains(&"Airflow."));
        assert!(contents.contains(&"Dashboards."));
    }

    #[tokio::test]
    async fn test_incremental_drops_deleted_files() {
        let data = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        write(data.path(), "roles/bi.md", "# BI Engineer\nDashboards.");
        write(data.path(), "roles/de.md", "# Data Engineer\nPipelines.");

        let ingestor = Ingestor::new(data.path(), store_dir.path(), provider());
        ingestor.run(IngestMode::Full).await.unwrap();

        std::fs::remove_file(data.path().join("roles/bi.md")).unwrap();
        let report = ingestor.run(IngestMode::Incremental).await.unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.documents, 0);
        assert_eq!(report.total_chunks, 1);

        let store = ChunkStore::load(store_dir.path()).await.unwrap();
        let sources: Vec<_> = store.sources().into_iter().collect();
        assert_eq!(sources, vec![data.path().join("roles/de.md").display().to_string()]);

        let metadata = IndexMetadata::read(store_dir.path()).await.unwrap().unwrap();
        assert_eq!(metadata.document_sources, sources);
    }
}
