use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single monthly charge for one cloud resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BillingRecord {
    /// First day of the billing period
    pub invoice_month: NaiveDate,
    pub account_id: String,
    pub subscription: String,
    pub service: String,
    pub resource_group: String,
    pub resource_id: String,
    pub region: String,
    pub usage_qty: f64,
    pub unit_cost: f64,
    pub cost: f64,
    /// Estimated fraction of `cost` that could be saved (0..=1)
    pub optimization_score: f64,
}

/// Static attributes of a resource, shared by all of its billing rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResourceMetadata {
    pub resource_id: String,
    pub owner: Option<String>,
    pub env: Option<String>,
    pub tags_json: Option<String>,
}

/// Billing row as produced by the generator or read back from CSV, before
/// quality checks. Carries the resource metadata columns alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBillingRow {
    pub invoice_month: NaiveDate,
    pub account_id: String,
    pub subscription: String,
    pub service: String,
    pub resource_group: String,
    pub resource_id: Option<String>,
    pub region: String,
    pub usage_qty: f64,
    pub unit_cost: f64,
    pub cost: Option<f64>,
    pub owner: Option<String>,
    pub env: Option<String>,
    pub tags_json: Option<String>,
    pub optimization_score: f64,
}

impl RawBillingRow {
    /// Split a checked row into its billing and metadata parts.
    ///
    /// Returns `None` when the row still lacks a resource id or a cost.
    pub fn into_parts(self) -> Option<(BillingRecord, ResourceMetadata)> {
        let resource_id = self.resource_id?;
        let cost = self.cost?;

        let metadata = ResourceMetadata {
            resource_id: resource_id.clone(),
            owner: self.owner,
            env: self.env,
            tags_json: self.tags_json,
        };

        let record = BillingRecord {
            invoice_month: self.invoice_month,
            account_id: self.account_id,
            subscription: self.subscription,
            service: self.service,
            resource_group: self.resource_group,
            resource_id,
            region: self.region,
            usage_qty: self.usage_qty,
            unit_cost: self.unit_cost,
            cost,
            optimization_score: self.optimization_score,
        };

        Some((record, metadata))
    }
}

/// Total spend for one invoice month.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct MonthlySpend {
    pub invoice_month: NaiveDate,
    pub total_cost: f64,
}
