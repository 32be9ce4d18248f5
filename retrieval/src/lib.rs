//! # Career Assistant
//!
//! Answers career questions by combining the role/skill graph with the
//! document index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Career Assistant                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  question ──► EntityExtractor ──► roles, skills                 │
//! │                                       │                         │
//! │                                       ▼                         │
//! │              GraphContextBuilder ◄── ContextCache               │
//! │                     │                                           │
//! │  question ──► DocumentRetriever ──► top-k chunks                │
//! │                     │                    │                      │
//! │                     └────────┬───────────┘                      │
//! │                              ▼                                  │
//! │                       AnswerAssembler ──► Answer                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use askcareer_retrieval::{AssistantConfig, CareerAssistant};
//!
//! let config = AssistantConfig::from_env(None).await?;
//! let assistant = CareerAssistant::from_config(config).await?;
//!
//! let answer = assistant
//!     .answer_question("How can I transition from BI Engineer to Data Engineer?")
//!     .await?;
//! println!("{answer}");
//! ```

pub mod answer;
pub mod assistant;
pub mod cache;
pub mod config;
pub mod error;
pub mod extraction;
pub mod graph_context;
pub mod retriever;

pub use answer::{Answer, AnswerAssembler, ERROR_ANSWER, FALLBACK_ANSWER, GRAPH_HEADER};
pub use assistant::{CareerAssistant, CareerAssistantBuilder, embedding_provider, graph_store};
pub use cache::{CacheKey, CacheStats, ContextCache};
pub use config::{
    AssistantConfig, CacheConfig, EmbeddingConfig, EmbeddingProviderType, GraphBackend,
    GraphConfig, IndexConfig, RetrievalSettings,
};
pub use error::{Result, RetrievalError};
pub use extraction::{EntityExtractor, ExtractedEntities, Vocabulary};
pub use graph_context::{
    GraphContextBuilder, PairPolicy, format_role, format_skill, format_transition,
};
pub use retriever::{DocumentRetriever, RetrievedDocument, format_document_context};

// Re-export from dependencies for convenience
pub use askcareer_graph::{RoleInfo, SkillGap, SkillInfo, TransitionPath};
