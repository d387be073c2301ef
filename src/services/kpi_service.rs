use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::billing_queries;
use crate::errors::AppError;
use crate::models::{CostDriver, KpiResponse};

/// Rows scoring below this are counted as waste
pub const WASTE_SCORE_THRESHOLD: f64 = 0.3;
pub const TOP_COST_DRIVERS: i64 = 5;

/// Compute the KPI snapshot for the latest invoice month.
///
/// Returns `AppError::NotFound` when the billing table is empty.
pub async fn compute_kpis(pool: &SqlitePool) -> Result<KpiResponse, AppError> {
    let spend_history = billing_queries::fetch_recent_monthly_spend(pool, 2).await?;

    let Some(current) = spend_history.last() else {
        warn!("KPI requested but no billing data is loaded");
        return Err(AppError::NotFound("No billing data found.".to_string()));
    };

    // With a single month on record the trend compares the month to itself
    let previous_total = if spend_history.len() > 1 {
        spend_history[0].total_cost
    } else {
        current.total_cost
    };

    let trend = monthly_trend_percentage(current.total_cost, previous_total);

    let savings = billing_queries::fetch_savings_opportunity(pool).await?;
    let waste =
        billing_queries::fetch_waste_for_month(pool, current.invoice_month, WASTE_SCORE_THRESHOLD)
            .await?;
    let drivers =
        billing_queries::fetch_top_services_for_month(pool, current.invoice_month, TOP_COST_DRIVERS)
            .await?;

    info!(
        month = %current.invoice_month,
        total = current.total_cost,
        trend,
        "Computed KPI snapshot"
    );

    Ok(KpiResponse {
        status: "success".to_string(),
        invoice_month: current.invoice_month,
        total_monthly_spend: round2(current.total_cost),
        savings_opportunities: round2(savings),
        waste_metrics: round2(waste),
        monthly_trend_percentage: round2(trend),
        top_5_cost_drivers: drivers
            .into_iter()
            .map(|d| CostDriver {
                service: d.service,
                cost: round2(d.cost),
            })
            .collect(),
    })
}

/// Month-over-month change in percent; 0 when the previous month is 0.
pub fn monthly_trend_percentage(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
