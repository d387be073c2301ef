use std::sync::Arc;

use sqlx::SqlitePool;

use crate::services::rag_service::RagEngine;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub rag: Arc<RagEngine>,
    pub dashboard_url: String,
}
