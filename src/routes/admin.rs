use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::rag_service::RagStatus;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/rag/status", get(get_rag_status))
        .route("/admin/rag/reset", post(reset_rag_engine))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RagStatusResponse {
    pub state: String,
    pub error: Option<String>,
}

impl From<RagStatus> for RagStatusResponse {
    fn from(status: RagStatus) -> Self {
        let state = status.label().to_string();
        let error = match status {
            RagStatus::Failed(e) => Some(e),
            _ => None,
        };
        Self { state, error }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RagResetResponse {
    pub previous_state: RagStatusResponse,
    pub state: RagStatusResponse,
}

/// GET /api/admin/rag/status
async fn get_rag_status(State(state): State<AppState>) -> Json<RagStatusResponse> {
    Json(state.rag.status().await.into())
}

/// POST /api/admin/rag/reset
///
/// Drops the cached pipeline or initialization error so the next chat
/// request initializes the engine again.
async fn reset_rag_engine(State(state): State<AppState>) -> Json<RagResetResponse> {
    info!("POST /api/admin/rag/reset - Resetting RAG engine");

    let previous = state.rag.reset().await;
    let current = state.rag.status().await;

    Json(RagResetResponse {
        previous_state: previous.into(),
        state: current.into(),
    })
}
