//! Embedding providers.
//!
//! The document index and the query must be embedded by the same model.
//! [`HttpEmbeddingProvider`] talks to any OpenAI-compatible `/embeddings`
//! endpoint. [`HashingProvider`] needs no model at all and is used in
//! tests. The in-process model lives in [`crate::local`].

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Model the vectors come from. Stored alongside the index.
    fn model(&self) -> &str;

    /// Dimension of the produced vectors.
    fn dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Provider for OpenAI-compatible embedding endpoints.
pub struct HttpEmbeddingProvider {
    /// API base URL, without the trailing `/embeddings`.
    base_url: String,

    /// Bearer token, if the endpoint needs one.
    api_key: Option<String>,

    /// Model requested from the endpoint.
    model: String,

    /// Expected vector dimension.
    dimension: usize,

    client: reqwest::Client,
}

impl HttpEmbeddingProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            dimension,
            client: reqwest::Client::new(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    async fn request(&self, input: serde_json::Value) -> Result<Vec<Embedding>> {
        let body = serde_json::json!({
            "input": input,
            "model": self.model,
        });

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!("{status}: {error_text}")));
        }

        let mut result: EmbeddingApiResponse = response.json().await?;
        result.data.sort_by_key(|item| item.index);

        let embeddings: Vec<Embedding> = result.data.into_iter().map(|d| d.embedding).collect();
        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!("Embedding query with model {}", self.model);
        self.request(serde_json::json!(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding in response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.request(serde_json::json!(texts)).await?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        info!("Generated {} batch embeddings", embeddings.len());
        Ok(embeddings)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingApiData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Offline provider based on signed feature hashing of word tokens.
///
/// Texts sharing vocabulary land close together, which is enough for
/// keyword-heavy career documents and keeps tests hermetic. Token buckets
/// come from SHA-256 so vectors are stable across builds and platforms.
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    pub const MODEL: &'static str = "askcareer-hashing-v1";

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        Self::MODEL
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.vectorize(text))
    }
}
