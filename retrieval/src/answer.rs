//! Turning graph context and retrieved documents into answer text.

use std::fmt;

use crate::retriever::RetrievedDocument;

pub const GRAPH_HEADER: &str = "Based on the career graph:";

pub const RESOURCES_HEADER: &str = "\nAdditional Resources:";

/// Returned when neither the graph nor the documents had anything to say.
pub const FALLBACK_ANSWER: &str = "I couldn't find specific information to answer your question. \
Please try rephrasing it or ask about specific roles or skills.";

/// Shown to users when answering failed.
pub const ERROR_ANSWER: &str =
    "I encountered an error while processing your question. Please try again.";

/// An answer plus the material it was assembled from.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub graph_context: Option<String>,
    pub documents: Vec<RetrievedDocument>,
    pub text: String,
}

impl Answer {
    /// Whether the answer is the rephrase message.
    pub fn is_fallback(&self) -> bool {
        self.graph_context.is_none() && self.documents.is_empty()
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Concatenates graph context and document snippets in a fixed order.
#[derive(Debug, Clone)]
pub struct AnswerAssembler {
    snippet_chars: usize,
}

impl Default for AnswerAssembler {
    fn default() -> Self {
        Self::new(200)
    }
}

impl AnswerAssembler {
    pub fn new(snippet_chars: usize) -> Self {
        Self { snippet_chars }
    }

    pub fn assemble(
        &self,
        graph_context: Option<String>,
        documents: Vec<RetrievedDocument>,
    ) -> Answer {
        let graph_context = graph_context.filter(|context| !context.is_empty());
        let text = self.render(graph_context.as_deref(), &documents);
        Answer {
            graph_context,
            documents,
            text,
        }
    }

    fn render(&self, graph_context: Option<&str>, documents: &[RetrievedDocument]) -> String {
        let mut parts = Vec::new();

        if let Some(context) = graph_context {
            parts.push(GRAPH_HEADER.to_string());
            parts.push(context.to_string());
        }

        if !documents.is_empty() {
            parts.push(RESOURCES_HEADER.to_string());
            for (i, document) in documents.iter().enumerate() {
                parts.push(format!("\nResource {}:", i + 1));
                parts.push(format!("Source: {}", document.source()));
                parts.push(format!(
                    "Content: {}...",
                    document.snippet(self.snippet_chars)
                ));
            }
        }

        if parts.is_empty() {
            return FALLBACK_ANSWER.to_string();
        }
        parts.join("\n")
    }
}
