use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::KpiResponse;
use crate::services::kpi_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/kpi", get(get_kpi_metrics))
}

/// GET /api/kpi
///
/// Headline spend metrics for the latest invoice month. 404 when no
/// billing data has been loaded.
async fn get_kpi_metrics(State(state): State<AppState>) -> Result<Json<KpiResponse>, AppError> {
    info!("GET /api/kpi - Computing KPI metrics");

    kpi_service::compute_kpis(&state.pool)
        .await
        .map(Json)
        .map_err(|e| {
            if let AppError::Db(db_err) = &e {
                error!("Failed to compute KPI metrics: {}", db_err);
            }
            e
        })
}
