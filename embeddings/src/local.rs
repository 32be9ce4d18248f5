//! In-process embedding with ONNX models run by `fastembed`.
//!
//! The model files are downloaded on first use and cached, after which no
//! network access is needed. Inference is CPU-bound and runs on the
//! blocking thread pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;

/// Chunks handed to the ONNX session at once.
const BATCH_SIZE: usize = 32;

struct LocalModel {
    /// Hugging Face id, also stored in the index metadata.
    id: &'static str,
    model: EmbeddingModel,
    dimension: usize,
}

static LOCAL_MODELS: [LocalModel; 4] = [
    LocalModel {
        id: "sentence-transformers/all-MiniLM-L6-v2",
        model: EmbeddingModel::AllMiniLML6V2,
        dimension: 384,
    },
    LocalModel {
        id: "sentence-transformers/all-MiniLM-L12-v2",
        model: EmbeddingModel::AllMiniLML12V2,
        dimension: 384,
    },
    LocalModel {
        id: "BAAI/bge-small-en-v1.5",
        model: EmbeddingModel::BGESmallENV15,
        dimension: 384,
    },
    LocalModel {
        id: "BAAI/bge-base-en-v1.5",
        model: EmbeddingModel::BGEBaseENV15,
        dimension: 768,
    },
];

/// Matches with or without the organisation prefix.
fn local_model(model: &str) -> Option<&'static LocalModel> {
    let name = model.rsplit('/').next().unwrap_or(model);
    LOCAL_MODELS.iter().find(|local| {
        local
            .id
            .rsplit('/')
            .next()
            .is_some_and(|id| id.eq_ignore_ascii_case(name))
    })
}

/// Output dimension of a model the local provider supports.
pub fn local_model_dimension(model: &str) -> Option<usize> {
    local_model(model).map(|local| local.dimension)
}

/// Provider running a sentence-transformers model inside the process.
pub struct FastEmbedProvider {
    model: String,
    dimension: usize,
    embedder: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedProvider {
    /// Load `model`, downloading it into `cache_dir` if needed.
    ///
    /// Fails for models outside the supported set without touching the
    /// network.
    pub async fn load(model: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let Some(local) = local_model(model) else {
            let supported: Vec<&str> = LOCAL_MODELS.iter().map(|local| local.id).collect();
            return Err(EmbeddingError::UnsupportedModel(format!(
                "{model} (local models: {})",
                supported.join(", ")
            )));
        };
        let fastembed_model = local.model.clone();

        info!("Loading local embedding model {model}");
        let embedder = tokio::task::spawn_blocking(move || {
            let mut options =
                InitOptions::new(fastembed_model).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| EmbeddingError::Model(e.to_string()))?
        .map_err(|e| EmbeddingError::Model(e.to_string()))?;

        Ok(Self {
            model: model.to_string(),
            dimension: local.dimension,
            embedder: Arc::new(Mutex::new(embedder)),
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        let embedder = Arc::clone(&self.embedder);
        let embeddings = tokio::task::spawn_blocking(move || {
            let embedder = embedder
                .lock()
                .map_err(|e| EmbeddingError::Model(e.to_string()))?;
            embedder
                .embed(texts, Some(BATCH_SIZE))
                .map_err(|e| EmbeddingError::Model(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::Model(e.to_string()))??;

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!("Embedding query locally with {}", self.model);
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding produced".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.run(texts.to_vec()).await?;
        info!("Generated {} local embeddings", embeddings.len());
        Ok(embeddings)
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}
