use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{LlmError, RagError};
use crate::models::{RagAnswer, RetrievedChunk};
use crate::services::llm_service::LlmProvider;
use crate::services::vector_store::VectorStore;

/// Retriever + prompt + generator, assembled once by the RAG engine.
pub struct RagPipeline {
    store: VectorStore,
    provider: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(store: VectorStore, provider: Arc<dyn LlmProvider>, top_k: usize) -> Self {
        Self {
            store,
            provider,
            top_k,
        }
    }

    /// Nearest chunks to the question, best match first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, RagError> {
        let mut embeddings = self.provider.embed(vec![question.to_string()]).await?;
        let query = embeddings.pop().ok_or_else(|| {
            LlmError::InvalidResponse("no embedding returned for question".to_string())
        })?;

        let hits = self.store.search(&query, self.top_k).await?;
        debug!(hits = hits.len(), "Retrieved context chunks");

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                text: hit.content,
                source_label: hit.source,
            })
            .collect())
    }

    /// Answer a question grounded in the retrieved chunks.
    pub async fn ask(&self, question: &str) -> Result<RagAnswer, RagError> {
        let retrieved_chunks = self.retrieve(question).await?;

        let context = retrieved_chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_rag_prompt(&context, question);

        let answer = self.provider.generate_completion(prompt).await?;
        info!(
            chunks = retrieved_chunks.len(),
            answer_chars = answer.len(),
            "RAG answer generated"
        );

        Ok(RagAnswer {
            answer,
            retrieved_chunks,
        })
    }
}

/// Build the grounded prompt sent to the model.
pub fn build_rag_prompt(context: &str, question: &str) -> String {
    format!(
        r#"ROLE AND CONSTRAINTS
You are an AI FinOps Copilot. Your only purpose is to help with cloud cost management and optimization.
Base your answer ONLY on the context below. If the context does not contain the information needed, say clearly that you cannot answer the question from the available data.

OUTPUT FORMAT AND TONE
1. Keep a professional, concise and data-driven tone.
2. Where it helps, summarize the relevant data or FinOps principle before giving a recommendation.
3. Always finish with a bulleted list of 1 to 3 specific, actionable next steps for cost optimization.

CONTEXT AND QUESTION
The context contains general FinOps best practices and a summary of recent billing records.

Context:
{}

Question: {}"#,
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = build_rag_prompt("EC2 spend rose 40%.", "Why did compute costs grow?");
        assert!(prompt.contains("Context:\nEC2 spend rose 40%."));
        assert!(prompt.ends_with("Question: Why did compute costs grow?"));
        assert!(prompt.contains("1 to 3 specific, actionable next steps"));
        assert!(prompt.contains("ONLY on the context"));
    }
}
