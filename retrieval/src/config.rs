//! Configuration for the career assistant.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables. Environment lookup is passed in as a closure so
//! callers (and tests) decide where variables come from.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use askcareer_documents::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use askcareer_embeddings::{DEFAULT_DIMENSION, DEFAULT_MODEL};
use askcareer_graph::DEFAULT_MAX_HOPS;

use crate::error::{Result, RetrievalError};
use crate::extraction::Vocabulary;
use crate::graph_context::PairPolicy;

pub const CONFIG_ENV: &str = "ASKCAREER_CONFIG";

/// Configuration for the career assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub graph: GraphConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalSettings,
    pub cache: CacheConfig,

    /// Role and skill names recognized in questions.
    pub vocabulary: Vocabulary,

    /// Which mentioned roles get a transition section.
    pub pair_policy: PairPolicy,
}

/// Which graph backend answers graph queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackend {
    /// Neo4j over its HTTP API.
    #[default]
    Neo4j,
    /// In-memory graph loaded from a JSON seed file.
    Memory,
}

impl FromStr for GraphBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neo4j" => Ok(Self::Neo4j),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown graph backend `{other}`")),
        }
    }
}

/// Configuration for the graph connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub backend: GraphBackend,

    /// Neo4j HTTP endpoint.
    pub uri: String,

    pub user: String,

    /// Required for the Neo4j backend. Never written back out.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    pub database: String,

    /// Seed file for the memory backend.
    pub seed: Option<PathBuf>,

    /// Longest transition path searched for.
    pub max_hops: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: GraphBackend::default(),
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: None,
            database: "neo4j".to_string(),
            seed: None,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// sentence-transformers model run in-process.
    #[default]
    Local,
    /// OpenAI-compatible embeddings endpoint.
    Http,
    /// Offline feature hashing.
    Hashing,
}

impl FromStr for EmbeddingProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "fastembed" => Ok(Self::Local),
            "http" => Ok(Self::Http),
            "hashing" => Ok(Self::Hashing),
            other => Err(format!("unknown embedding provider `{other}`")),
        }
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderType,

    /// Base URL of the embeddings endpoint, without `/embeddings`.
    pub url: String,

    pub model: String,
    pub dimension: usize,

    /// Where local model files are downloaded to. Defaults to fastembed's
    /// own cache directory.
    pub cache_dir: Option<PathBuf>,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::default(),
            url: "http://localhost:8080/v1".to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            cache_dir: None,
            api_key: None,
        }
    }
}

/// Where documents come from and where the index lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Persisted chunk store.
    pub dir: PathBuf,

    /// Markdown knowledge base.
    pub data_dir: PathBuf,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("rag/vector_store"),
            data_dir: PathBuf::from("data"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Query-time retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Documents retrieved per question.
    pub top_k: usize,

    /// Characters of each document shown in an answer.
    pub snippet_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            snippet_chars: 200,
        }
    }
}

/// Configuration for the role/skill context cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,

    /// Entries older than this are refetched. `None` keeps them for the
    /// life of the process.
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 256,
            ttl_secs: None,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| RetrievalError::Config(format!("{key}: {e}")))
        })
        .transpose()
}

impl AssistantConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no backend can honour.
    pub fn validate(&self) -> Result<()> {
        if self.graph.max_hops == 0 {
            return Err(RetrievalError::Config(
                "graph.max_hops must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            RetrievalError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Override values from environment variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(uri) = lookup("NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.graph.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.graph.password = Some(password);
        }
        if let Some(database) = lookup("NEO4J_DATABASE") {
            self.graph.database = database;
        }
        if let Some(backend) = parse_var(&lookup, "ASKCAREER_GRAPH_BACKEND")? {
            self.graph.backend = backend;
        }
        if let Some(seed) = lookup("ASKCAREER_GRAPH_SEED") {
            self.graph.seed = Some(PathBuf::from(seed));
        }

        if let Some(dir) = lookup("ASKCAREER_INDEX_DIR") {
            self.index.dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("ASKCAREER_DATA_DIR") {
            self.index.data_dir = PathBuf::from(dir);
        }

        if let Some(provider) = parse_var(&lookup, "ASKCAREER_EMBEDDING_PROVIDER")? {
            self.embedding.provider = provider;
        }
        if let Some(url) = lookup("ASKCAREER_EMBEDDING_URL") {
            self.embedding.url = url;
        }
        if let Some(model) = lookup("ASKCAREER_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dimension) = parse_var(&lookup, "ASKCAREER_EMBEDDING_DIM")? {
            self.embedding.dimension = dimension;
        }
        if let Some(dir) = lookup("ASKCAREER_EMBEDDING_CACHE_DIR") {
            self.embedding.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = lookup("ASKCAREER_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }

        Ok(())
    }

    /// Defaults, then the TOML file at `path` (or named by
    /// `ASKCAREER_CONFIG`), then the environment.
    pub async fn load(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(CONFIG_ENV).map(PathBuf::from));

        let mut config = match &file {
            Some(file) => {
                debug!("Reading config from {}", file.display());
                Self::from_file(file).await?
            }
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// [`AssistantConfig::load`] against the process environment.
    pub async fn from_env(path: Option<&Path>) -> Result<Self> {
        Self::load(path, |key| std::env::var(key).ok()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.graph.uri, "http://localhost:7474");
        assert_eq!(config.graph.database, "neo4j");
        assert_eq!(config.graph.password, None);
        assert_eq!(config.graph.max_hops, 5);
        assert_eq!(config.index.dir, PathBuf::from("rag/vector_store"));
        assert_eq!(config.embedding.provider, EmbeddingProviderType::Local);
        assert_eq!(config.embedding.model, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.pair_policy, PairPolicy::FirstMentioned);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AssistantConfig::default();
        config
            .apply_env(env(&[
                ("NEO4J_URI", "http://graph:7474"),
                ("NEO4J_PASSWORD", "secret"),
                ("ASKCAREER_GRAPH_BACKEND", "memory"),
                ("ASKCAREER_EMBEDDING_PROVIDER", "hashing"),
                ("ASKCAREER_EMBEDDING_DIM", "64"),
                ("ASKCAREER_INDEX_DIR", "/tmp/index"),
            ]))
            .unwrap();

        assert_eq!(config.graph.uri, "http://graph:7474");
        assert_eq!(config.graph.password.as_deref(), Some("secret"));
        assert_eq!(config.graph.backend, GraphBackend::Memory);
        assert_eq!(config.embedding.provider, EmbeddingProviderType::Hashing);
        assert_eq!(config.embedding.dimension, 64);
        assert_eq!(config.index.dir, PathBuf::from("/tmp/index"));
    }

    #[test]
    fn test_empty_password_counts_as_missing() {
        let mut config = AssistantConfig::default();
        config.apply_env(env(&[("NEO4J_PASSWORD", "  ")])).unwrap();
        assert_eq!(config.graph.password, None);
    }

    #[test]
    fn test_bad_env_values_are_errors() {
        let mut config = AssistantConfig::default();
        let err = config
            .apply_env(env(&[("ASKCAREER_EMBEDDING_DIM", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("ASKCAREER_EMBEDDING_DIM"));

        let err = config
            .apply_env(env(&[("ASKCAREER_GRAPH_BACKEND", "sqlite")]))
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AssistantConfig::from_toml_str(
            r#"
            pair_policy = "require_exactly_two"

            [vocabulary]
            roles = ["Platform Engineer"]
            skills = ["Kubernetes"]

            [retrieval]
            top_k = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.vocabulary.roles, vec!["Platform Engineer"]);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.snippet_chars, 200);
        assert_eq!(config.pair_policy, PairPolicy::RequireExactlyTwo);
        assert_eq!(config.graph.user, "neo4j");
    }

    #[test]
    fn test_zero_max_hops_is_rejected() {
        let err = AssistantConfig::from_toml_str("[graph]\nmax_hops = 0\n").unwrap_err();
        assert!(matches!(err, RetrievalError::Config(ref msg) if msg.contains("max_hops")));

        let config = AssistantConfig::from_toml_str("[graph]\nmax_hops = 1\n").unwrap();
        assert_eq!(config.graph.max_hops, 1);
    }

    #[tokio::test]
    async fn test_load_layers_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("askcareer.toml");
        std::fs::write(&path, "[graph]\nuser = \"reader\"\ndatabase = \"careers\"\n").unwrap();

        let config = AssistantConfig::load(
            None,
            env(&[
                (CONFIG_ENV, path.to_str().unwrap()),
                ("NEO4J_DATABASE", "override"),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(config.graph.user, "reader");
        assert_eq!(config.graph.database, "override");
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let err = AssistantConfig::load(Some(Path::new("/nonexistent/askcareer.toml")), env(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
    }
}
