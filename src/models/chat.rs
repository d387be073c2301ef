use serde::{Deserialize, Serialize};

pub const UNKNOWN_SOURCE: &str = "Unknown Source";

/// User question for the copilot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Success,
    Error,
}

/// Answer returned to the dashboard.
///
/// `sources` is the comma-separated list of source labels, in retrieval
/// order and without deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: String,
    pub status: ChatStatus,
}

impl ChatResponse {
    /// Degraded response used while the RAG engine is unavailable.
    pub fn offline(reason: &str, model: &str) -> Self {
        Self {
            answer: format!(
                "AI System is temporarily offline. Reason: {}. Please ensure Ollama is running and the '{}' model is pulled.",
                reason, model
            ),
            sources: "N/A".to_string(),
            status: ChatStatus::Error,
        }
    }
}

impl From<RagAnswer> for ChatResponse {
    fn from(answer: RagAnswer) -> Self {
        let sources = answer.source_labels().join(", ");
        Self {
            answer: answer.answer,
            sources,
            status: ChatStatus::Success,
        }
    }
}

/// A chunk handed to the model as context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub source_label: Option<String>,
}

/// Generated answer together with the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub retrieved_chunks: Vec<RetrievedChunk>,
}

impl RagAnswer {
    pub fn source_labels(&self) -> Vec<&str> {
        self.retrieved_chunks
            .iter()
            .map(|c| c.source_label.as_deref().unwrap_or(UNKNOWN_SOURCE))
            .collect()
    }
}
