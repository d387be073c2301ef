use axum::{routing::get, Json, Router};
use tracing::debug;

use crate::models::HealthCheckResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<HealthCheckResponse> {
    debug!("GET /api/health - Health check");
    Json(HealthCheckResponse::ok())
}
