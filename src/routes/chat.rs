use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ask", post(ask_ai_copilot))
}

/// POST /api/ask
///
/// Request body: ChatRequest
/// {
///   "question": "Which service drove last month's increase?"
/// }
///
/// The RAG engine is initialized on the first request. While it is not
/// ready the endpoint still answers 200 with `status: "error"`; only a
/// failure inside a ready pipeline becomes a 500.
async fn ask_ai_copilot(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("question must not be empty".to_string()));
    }
    info!("POST /api/ask - Question: {}", question);

    let pipeline = match state.rag.get_or_init().await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            warn!("RAG system offline: {}", e);
            return Ok(Json(ChatResponse::offline(
                &e.to_string(),
                state.rag.model_name(),
            )));
        }
    };

    let answer = pipeline.ask(question).await.map_err(|e| {
        error!("Error invoking RAG pipeline: {}", e);
        AppError::Rag(e)
    })?;

    info!(
        "Answered question using {} context chunks",
        answer.retrieved_chunks.len()
    );

    Ok(Json(ChatResponse::from(answer)))
}
