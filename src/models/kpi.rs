use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Summed spend for one service in the latest invoice month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CostDriver {
    pub service: String,
    pub cost: f64,
}

/// Snapshot of the headline FinOps metrics.
///
/// Monetary values and the trend are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResponse {
    pub status: String,
    /// Latest invoice month present in the data
    pub invoice_month: NaiveDate,
    pub total_monthly_spend: f64,
    /// Sum of cost * optimization_score across every month on record
    pub savings_opportunities: f64,
    /// Latest-month spend on resources scoring below the waste threshold
    pub waste_metrics: f64,
    pub monthly_trend_percentage: f64,
    pub top_5_cost_drivers: Vec<CostDriver>,
}
