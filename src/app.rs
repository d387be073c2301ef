use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{admin, chat, health, kpi};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let api = Router::<AppState>::new()
        .merge(health::router())
        .merge(kpi::router())
        .merge(chat::router())
        .merge(admin::router());

    Router::<AppState>::new()
        .route("/", get(read_root))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn read_root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Welcome to the AI Cost & Insights Copilot API. Go to the dashboard.",
        "dashboard_url": state.dashboard_url,
    }))
}
