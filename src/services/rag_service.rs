//! Lazily initialized retrieval-augmented chat engine.
//!
//! The engine starts `Uninitialized`. The first caller of
//! [`RagEngine::get_or_init`] takes the init lock and builds the pipeline;
//! concurrent callers queue on that lock and share its outcome. The
//! observable state sits behind a separate lock that is only held briefly,
//! so status and reset stay responsive while an attempt is `Initializing`.
//! Success is cached as `Ready`; failure is cached as `Failed` and returned
//! to every later caller until [`RagEngine::reset`] is called.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use url::Url;

use crate::config::RagConfig;
use crate::errors::RagError;
use crate::services::document_loader;
use crate::services::llm_service::{self, LlmConfig, LlmProvider, ProviderFactory};
use crate::services::rag_pipeline::RagPipeline;
use crate::services::text_splitter::RecursiveCharacterSplitter;
use crate::services::vector_store::{EmbeddedChunk, VectorStore};

/// Number of chunks embedded per model call while building the index
const EMBED_BATCH_SIZE: usize = 32;

enum RagState {
    Uninitialized,
    Initializing,
    Ready(Arc<RagPipeline>),
    Failed(RagError),
}

struct EngineState {
    current: RagState,
    /// Bumped by every reset; an attempt started under an older generation
    /// does not publish its outcome.
    generation: u64,
}

/// Externally visible engine state
#[derive(Debug, Clone, PartialEq)]
pub enum RagStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

impl RagStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RagStatus::Uninitialized => "uninitialized",
            RagStatus::Initializing => "initializing",
            RagStatus::Ready => "ready",
            RagStatus::Failed(_) => "failed",
        }
    }
}

pub struct RagEngine {
    config: RagConfig,
    factory: Arc<dyn ProviderFactory>,
    state: Mutex<EngineState>,
    init_lock: Mutex<()>,
}

impl RagEngine {
    pub fn new(config: RagConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            config,
            factory,
            state: Mutex::new(EngineState {
                current: RagState::Uninitialized,
                generation: 0,
            }),
            init_lock: Mutex::new(()),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Return the ready pipeline, building it on the first call.
    pub async fn get_or_init(&self) -> Result<Arc<RagPipeline>, RagError> {
        if let Some(outcome) = self.cached_outcome().await {
            return outcome;
        }

        let _init = self.init_lock.lock().await;

        // Another caller may have finished while we waited for the lock
        let generation = {
            let mut state = self.state.lock().await;
            match &state.current {
                RagState::Ready(pipeline) => return Ok(pipeline.clone()),
                RagState::Failed(e) => return Err(e.clone()),
                RagState::Uninitialized | RagState::Initializing => {}
            }
            state.current = RagState::Initializing;
            state.generation
        };

        info!("Attempting RAG system initialization");
        let outcome = self.initialize().await.map(Arc::new);

        let mut state = self.state.lock().await;
        let published = state.generation == generation;
        match &outcome {
            Ok(pipeline) => {
                info!("RAG system initialized successfully");
                if published {
                    state.current = RagState::Ready(pipeline.clone());
                }
            }
            Err(e) => {
                error!(error = %e, "RAG system initialization failed");
                if published {
                    state.current = RagState::Failed(e.clone());
                }
            }
        }
        if !published {
            warn!("Engine was reset during initialization, outcome not cached");
        }

        outcome
    }

    async fn cached_outcome(&self) -> Option<Result<Arc<RagPipeline>, RagError>> {
        match &self.state.lock().await.current {
            RagState::Ready(pipeline) => Some(Ok(pipeline.clone())),
            RagState::Failed(e) => Some(Err(e.clone())),
            RagState::Uninitialized | RagState::Initializing => None,
        }
    }

    pub async fn status(&self) -> RagStatus {
        status_of(&self.state.lock().await.current)
    }

    /// Forget the cached pipeline or failure; the next call re-initializes.
    /// An attempt still in flight finishes but its outcome is discarded.
    /// Returns the state that was discarded.
    pub async fn reset(&self) -> RagStatus {
        let mut state = self.state.lock().await;
        let previous = status_of(&state.current);
        state.current = RagState::Uninitialized;
        state.generation += 1;
        warn!(previous = previous.label(), "RAG engine reset");
        previous
    }

    async fn initialize(&self) -> Result<RagPipeline, RagError> {
        let base_url = validate_llm_endpoint(
            self.config.llm_base_url.as_deref(),
            self.config.expected_llm_host.as_deref(),
        )?;

        let llm_config = LlmConfig {
            model: self.config.model.clone(),
            embedding_model: self.config.embedding_model.clone(),
            timeout: self.config.request_timeout,
        };

        let store = VectorStore::open(&self.config.vector_store_path).await?;
        let provider = self
            .factory
            .connect(&base_url, &llm_config)
            .await
            .map_err(|e| RagError::Initialization(format!("cannot connect to model service: {}", e)))?;

        let existing = store.count().await?;
        if existing == 0 {
            info!("Vector store is empty, loading documents and creating embeddings");
            self.build_index(&store, provider.as_ref()).await?;
        } else {
            info!(chunks = existing, "Reusing existing vector store");
        }

        Ok(RagPipeline::new(store, provider, self.config.top_k))
    }

    /// Embed the whole corpus, then write it in one transaction so a failed
    /// attempt leaves the store empty.
    async fn build_index(&self, store: &VectorStore, provider: &dyn LlmProvider) -> Result<(), RagError> {
        let documents = document_loader::load_corpus(
            &self.config.tips_path,
            &self.config.billing_csv_path,
            self.config.summary_rows,
        )
        .await;

        let splitter = RecursiveCharacterSplitter::new(self.config.chunk_size, self.config.chunk_overlap);
        let chunks = splitter.split_documents(&documents);
        if chunks.is_empty() {
            warn!("No documents to index, chat answers will have no context");
            return Ok(());
        }

        let mut embedded = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts = batch.iter().map(|d| d.content.clone()).collect();
            let embeddings = provider
                .embed(texts)
                .await
                .map_err(|e| RagError::Initialization(format!("embedding documents failed: {}", e)))?;

            if embeddings.len() != batch.len() {
                return Err(RagError::Initialization(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            embedded.extend(batch.iter().zip(embeddings).map(|(doc, embedding)| EmbeddedChunk {
                source: doc.source.clone(),
                content: doc.content.clone(),
                embedding,
            }));
        }

        let inserted = store.add_chunks(&embedded).await?;
        info!(chunks = inserted, "Vector store initialized");
        Ok(())
    }
}

fn status_of(state: &RagState) -> RagStatus {
    match state {
        RagState::Uninitialized => RagStatus::Uninitialized,
        RagState::Initializing => RagStatus::Initializing,
        RagState::Ready(_) => RagStatus::Ready,
        RagState::Failed(e) => RagStatus::Failed(e.to_string()),
    }
}

/// Check that the model service URL is set, well formed and aimed at the
/// expected host.
pub fn validate_llm_endpoint(raw: Option<&str>, expected_host: Option<&str>) -> Result<Url, RagError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Err(RagError::Configuration(
            "OLLAMA_BASE_URL is missing. Set it to the model service address, e.g. http://host.docker.internal:11434".to_string(),
        ));
    };

    let url = Url::parse(raw)
        .map_err(|e| RagError::Configuration(format!("OLLAMA_BASE_URL '{}' is invalid: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RagError::Configuration(format!(
            "OLLAMA_BASE_URL '{}' must use http or https",
            raw
        )));
    }

    let Some(host) = url.host_str() else {
        return Err(RagError::Configuration(format!(
            "OLLAMA_BASE_URL '{}' has no host",
            raw
        )));
    };

    if let Some(expected) = expected_host {
        if !host.eq_ignore_ascii_case(expected) {
            return Err(RagError::Configuration(format!(
                "OLLAMA_BASE_URL '{}' points at '{}' but must point at '{}'",
                raw, host, expected
            )));
        }
    }

    Ok(llm_service::with_trailing_slash(url))
}
