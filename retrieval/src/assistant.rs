//! The career assistant: questions in, answers out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use askcareer_documents::ChunkStore;
use askcareer_embeddings::{
    EmbeddingProvider, FastEmbedProvider, HashingProvider, HttpEmbeddingProvider,
};
use askcareer_graph::{
    CareerGraph, GraphStore, MemoryGraph, Neo4jConfig, Neo4jStore, RoleInfo, SkillGap, SkillInfo,
    TransitionPath,
};

use crate::answer::{Answer, AnswerAssembler};
use crate::cache::{CacheStats, ContextCache};
use crate::config::{
    AssistantConfig, EmbeddingConfig, EmbeddingProviderType, GraphBackend, GraphConfig,
};
use crate::error::{Result, RetrievalError};
use crate::extraction::{EntityExtractor, ExtractedEntities};
use crate::graph_context::GraphContextBuilder;
use crate::retriever::{DocumentRetriever, RetrievedDocument};

/// Open the graph backend named in `config`.
///
/// The Neo4j backend needs a password; without one this fails with
/// [`RetrievalError::MissingCredential`] before any connection is made.
pub async fn graph_store(config: &GraphConfig) -> Result<Arc<dyn GraphStore>> {
    match config.backend {
        GraphBackend::Neo4j => {
            let password = config
                .password
                .clone()
                .ok_or_else(|| RetrievalError::MissingCredential("NEO4J_PASSWORD".to_string()))?;
            let store = Neo4jStore::new(Neo4jConfig {
                uri: config.uri.clone(),
                user: config.user.clone(),
                password,
                database: config.database.clone(),
            })?;
            Ok(Arc::new(store))
        }
        GraphBackend::Memory => {
            let seed = config.seed.as_deref().ok_or_else(|| {
                RetrievalError::Config(
                    "the memory graph backend needs a seed file \
                     (graph.seed or ASKCAREER_GRAPH_SEED)"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(MemoryGraph::load(seed).await?))
        }
    }
}

/// Build the embedding provider named in `config`.
///
/// The local provider loads its model here, downloading it on first use.
pub async fn embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderType::Local => {
            let provider = FastEmbedProvider::load(&config.model, config.cache_dir.clone()).await?;
            if provider.dimension() != config.dimension {
                return Err(RetrievalError::Config(format!(
                    "{} produces {}-dimensional vectors, configured dimension is {}",
                    config.model,
                    provider.dimension(),
                    config.dimension
                )));
            }
            Ok(Arc::new(provider))
        }
        EmbeddingProviderType::Http => {
            let provider =
                HttpEmbeddingProvider::new(&config.url, &config.model, config.dimension);
            Ok(match &config.api_key {
                Some(key) => Arc::new(provider.with_api_key(key)),
                None => Arc::new(provider),
            })
        }
        EmbeddingProviderType::Hashing => Ok(Arc::new(HashingProvider::new(config.dimension))),
    }
}

/// Answers career questions from the role/skill graph and the document
/// index.
///
/// Each question runs start to finish on the caller's task: extraction,
/// graph queries, one similarity search, then formatting.
pub struct CareerAssistant {
    config: AssistantConfig,
    extractor: EntityExtractor,
    graph_context: GraphContextBuilder,
    retriever: Option<DocumentRetriever>,
    assembler: AnswerAssembler,
}

impl CareerAssistant {
    pub fn builder() -> CareerAssistantBuilder {
        CareerAssistantBuilder::new()
    }

    pub async fn from_config(config: AssistantConfig) -> Result<Self> {
        CareerAssistantBuilder::new().with_config(config).build().await
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn graph(&self) -> &CareerGraph {
        self.graph_context.graph()
    }

    /// Whether a document index was loaded.
    pub fn has_documents(&self) -> bool {
        self.retriever.is_some()
    }

    /// Role names offered for selection, in vocabulary order.
    pub fn roles(&self) -> Vec<String> {
        self.extractor.roles().map(str::to_string).collect()
    }

    pub fn extract(&self, question: &str) -> ExtractedEntities {
        self.extractor.extract(question)
    }

    /// Answer a free-text question.
    pub async fn answer_question(&self, question: &str) -> Result<Answer> {
        info!("Answering question: {question}");

        let entities = self.extract(question);
        let graph_context = self.graph_context(&entities).await?;
        let documents = self
            .relevant_documents(question, self.config.retrieval.top_k)
            .await?;

        let answer = self.assembler.assemble(graph_context, documents);
        debug!(
            "Answer built from {} documents{}",
            answer.documents.len(),
            if answer.graph_context.is_some() { " and graph context" } else { "" }
        );
        Ok(answer)
    }

    /// Graph text for already extracted entities.
    pub async fn graph_context(&self, entities: &ExtractedEntities) -> Result<Option<String>> {
        self.graph_context.build(entities).await
    }

    /// The `k` chunks nearest to `query`. Empty without a document index.
    pub async fn relevant_documents(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        match &self.retriever {
            Some(retriever) => retriever.retrieve(query, k).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn role_info(&self, role: &str) -> Result<Option<RoleInfo>> {
        Ok(self.graph().role_info(role).await?)
    }

    /// A skill with the roles needing it and its prerequisites.
    pub async fn skill_info(&self, skill: &str) -> Result<Option<SkillInfo>> {
        Ok(self.graph().skill_info_with_prerequisites(skill).await?)
    }

    pub async fn transition_path(&self, from: &str, to: &str) -> Result<Option<TransitionPath>> {
        Ok(self.graph().transition_path(from, to).await?)
    }

    pub async fn skill_gap(&self, current: &str, target: &str) -> Result<SkillGap> {
        Ok(self.graph().skill_gap(current, target).await?)
    }

    /// Path and skill gap between two roles, or `None` when they are not
    /// connected.
    pub async fn transition_report(&self, from: &str, to: &str) -> Result<Option<String>> {
        self.graph_context.transition_report(from, to).await
    }

    /// Ask which skills to develop, naming the skills the target adds.
    pub async fn skill_gaps(&self, current: &str, target: &str) -> Result<Answer> {
        let gap = self.skill_gap(current, target).await?;
        let missing: Vec<&str> = gap.to_learn.iter().map(String::as_str).collect();
        let question = format!(
            "What skills do I need to develop to transition from {current} to {target}? \
             Specifically, I need to learn: {}",
            missing.join(", ")
        );
        self.answer_question(&question).await
    }

    /// Ask about a role, naming the skills it requires.
    pub async fn role_description(&self, role: &str) -> Result<Answer> {
        let skills = self
            .role_info(role)
            .await?
            .map(|info| info.skills)
            .unwrap_or_default();
        let question = format!(
            "What are the key responsibilities and requirements for a {role}? \
             The role requires these skills: {}",
            skills.join(", ")
        );
        self.answer_question(&question).await
    }

    /// Ask for a learning path, naming the roles along the transition path.
    pub async fn learning_path(&self, from: &str, to: &str) -> Result<Answer> {
        let roles = self
            .transition_path(from, to)
            .await?
            .map(|path| path.nodes)
            .unwrap_or_default();
        let question = format!(
            "What is the recommended learning path to transition from {from} to {to}? \
             The path includes these roles: {}",
            roles.join(", ")
        );
        self.answer_question(&question).await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.graph_context.cache().stats().await
    }
}

impl std::fmt::Debug for CareerAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CareerAssistant")
            .field("graph", self.graph())
            .field("retriever", &self.retriever)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CareerAssistant`].
///
/// Anything not supplied explicitly is created from the configuration.
pub struct CareerAssistantBuilder {
    config: AssistantConfig,
    graph_store: Option<Arc<dyn GraphStore>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    cache: Option<Arc<ContextCache>>,
    chunk_store: Option<Arc<ChunkStore>>,
}

impl CareerAssistantBuilder {
    pub fn new() -> Self {
        Self {
            config: AssistantConfig::default(),
            graph_store: None,
            provider: None,
            cache: None,
            chunk_store: None,
        }
    }

    pub fn with_config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this graph backend instead of the configured one.
    pub fn with_graph_store(mut self, store: Arc<dyn GraphStore>) -> Self {
        self.graph_store = Some(store);
        self
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Share a context cache, e.g. between assistants or with a test.
    pub fn with_cache(mut self, cache: Arc<ContextCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use an already loaded chunk store instead of reading `index.dir`.
    pub fn with_chunk_store(mut self, store: Arc<ChunkStore>) -> Self {
        self.chunk_store = Some(store);
        self
    }

    /// Build the assistant.
    ///
    /// A missing document index is not fatal: the assistant then answers
    /// from the graph alone. An index built with a different embedding
    /// model is an error.
    pub async fn build(self) -> Result<CareerAssistant> {
        let config = self.config;
        config.validate()?;

        let store = match self.graph_store {
            Some(store) => store,
            None => graph_store(&config.graph).await?,
        };
        let graph = CareerGraph::new(store).with_max_hops(config.graph.max_hops);
        info!("Using {} graph backend", graph.backend());

        let chunk_store = match self.chunk_store {
            Some(store) => Some(store),
            None if ChunkStore::exists(&config.index.dir) => {
                Some(Arc::new(ChunkStore::load(&config.index.dir).await?))
            }
            None => {
                warn!(
                    "No document index at {}; answers will use the graph only",
                    config.index.dir.display()
                );
                None
            }
        };
        // No model is loaded without an index.
        let retriever = match chunk_store {
            Some(store) => {
                let provider = match self.provider {
                    Some(provider) => provider,
                    None => embedding_provider(&config.embedding).await?,
                };
                Some(DocumentRetriever::new(store, provider)?)
            }
            None => None,
        };

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ContextCache::from_config(&config.cache)));
        let graph_context =
            GraphContextBuilder::new(graph, cache).with_pair_policy(config.pair_policy);

        Ok(CareerAssistant {
            extractor: EntityExtractor::new(&config.vocabulary),
            assembler: AnswerAssembler::new(config.retrieval.snippet_chars),
            graph_context,
            retriever,
            config,
        })
    }
}

impl Default for CareerAssistantBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askcareer_embeddings::EmbeddingError;
    use askcareer_graph::GraphSeed;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn seed_graph() -> Arc<dyn GraphStore> {
        let seed: GraphSeed = serde_json::from_value(json!({
            "roles": [
                { "name": "Data Analyst", "skills": ["SQL", "Statistics"] },
                { "name": "Data Engineer", "skills": ["SQL", "Python"] }
            ],
            "relationships": [
                { "from": "Data Analyst", "type": "TRANSITIONS_TO", "to": "Data Engineer" }
            ]
        }))
        .unwrap();
        Arc::new(MemoryGraph::from_seed(seed).unwrap())
    }

    async fn assistant() -> (TempDir, CareerAssistant) {
        let dir = TempDir::new().unwrap();
        let mut config = AssistantConfig::default();
        config.index.dir = dir.path().join("missing");

        let assistant = CareerAssistant::builder()
            .with_config(config)
            .with_graph_store(seed_graph())
            .with_embedding_provider(Arc::new(HashingProvider::new(32)))
            .build()
            .await
            .unwrap();
        (dir, assistant)
    }

    #[tokio::test]
    async fn test_neo4j_without_password_is_fatal() {
        let err = graph_store(&GraphConfig::default()).await.err().unwrap();
        assert!(matches!(
            err,
            RetrievalError::MissingCredential(ref name) if name == "NEO4J_PASSWORD"
        ));
    }

    #[tokio::test]
    async fn test_memory_backend_needs_seed() {
        let config = GraphConfig {
            backend: GraphBackend::Memory,
            ..GraphConfig::default()
        };
        assert!(matches!(
            graph_store(&config).await,
            Err(RetrievalError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_from_config() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::Hashing,
            dimension: 16,
            ..EmbeddingConfig::default()
        };
        let provider = embedding_provider(&config).await.unwrap();
        assert_eq!(provider.model(), HashingProvider::MODEL);
        assert_eq!(provider.dimension(), 16);
    }

    #[tokio::test]
    async fn test_local_provider_rejects_unknown_model() {
        let config = EmbeddingConfig {
            model: "text-embedding-3-small".to_string(),
            ..EmbeddingConfig::default()
        };
        let err = embedding_provider(&config).await.err().unwrap();
        assert!(matches!(
            err,
            RetrievalError::Embedding(EmbeddingError::UnsupportedModel(_))
        ));
    }

    #[tokio::test]
    #[ignore = "downloads the all-MiniLM-L6-v2 ONNX model"]
    async fn test_default_provider_is_local_minilm() {
        let cache = TempDir::new().unwrap();
        let config = EmbeddingConfig {
            cache_dir: Some(cache.path().to_path_buf()),
            ..EmbeddingConfig::default()
        };
        let provider = embedding_provider(&config).await.unwrap();

        assert_eq!(provider.name(), "local");
        assert_eq!(provider.model(), "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(provider.dimension(), 384);
        assert_eq!(provider.embed("Data Engineer").await.unwrap().len(), 384);
    }

    #[tokio::test]
    async fn test_zero_max_hops_is_rejected_at_build() {
        let mut config = AssistantConfig::default();
        config.graph.max_hops = 0;

        let result = CareerAssistant::builder()
            .with_config(config)
            .with_graph_store(seed_graph())
            .build()
            .await;
        assert!(matches!(result, Err(RetrievalError::Config(_))));
    }

    #[tokio::test]
    async fn test_graph_only_without_index() {
        let (_dir, assistant) = assistant().await;
        assert!(!assistant.has_documents());

        let answer = assistant
            .answer_question("Moving from Data Analyst to Data Engineer")
            .await
            .unwrap();
        assert!(answer.text.starts_with("Based on the career graph:\nRole Information:"));
        assert!(answer.text.contains("Skills to Learn:\n- Python"));
        assert!(answer.documents.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_answer() {
        let (_dir, assistant) = assistant().await;
        let answer = assistant.answer_question("How do I become an astronaut?").await.unwrap();
        assert!(answer.is_fallback());
    }

    #[tokio::test]
    async fn test_transition_report_and_missing_role() {
        let (_dir, assistant) = assistant().await;

        let report = assistant
            .transition_report("Data Analyst", "Data Engineer")
            .await
            .unwrap()
            .unwrap();
        assert!(report.contains("Path: Data Analyst -[TRANSITIONS_TO]-> Data Engineer"));

        assert_eq!(
            assistant
                .transition_report("Data Engineer", "Data Analyst")
                .await
                .unwrap(),
            None
        );
        assert_eq!(assistant.role_info("Astronaut").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_roles_follow_vocabulary() {
        let (_dir, assistant) = assistant().await;
        assert_eq!(
            assistant.roles(),
            vec![
                "BI Engineer",
                "Data Engineer",
                "Data Analyst",
                "Machine Learning Engineer"
            ]
        );
    }
}
