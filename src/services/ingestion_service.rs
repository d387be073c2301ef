use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Months, NaiveDate};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::billing_queries;
use crate::models::{BillingRecord, RawBillingRow, ResourceMetadata};

pub const DEFAULT_NUM_RECORDS: usize = 1500;
pub const DEFAULT_MONTHS_HISTORY: u32 = 8;

const SERVICES: &[&str] = &["EC2", "S3", "RDS", "Lambda", "EKS", "Azure VM", "GCP Compute"];
const REGIONS: &[&str] = &["us-east-1", "us-west-2", "eu-central-1", "asia-south-1"];
const SUBSCRIPTIONS: &[&str] = &["Prod", "Dev", "Test"];
const OWNERS: &[Option<&str>] = &[Some("alice"), Some("bob"), Some("charlie"), None];
const ENVIRONMENTS: &[&str] = &["prod", "staging", "dev"];

/// 0-based month index that receives the EC2 cost spike
const SPIKE_MONTH_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub billing_records: u64,
    pub resource_metadata: u64,
}

fn start_month() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// Generate `num_records` random billing rows spread over `months_history`
/// consecutive invoice months.
pub fn generate_synthetic_data<R: Rng + ?Sized>(
    num_records: usize,
    months_history: u32,
    rng: &mut R,
) -> Vec<RawBillingRow> {
    let months: Vec<NaiveDate> = (0..months_history.max(1))
        .filter_map(|i| start_month().checked_add_months(Months::new(i)))
        .collect();
    let spike_month = months
        .get(SPIKE_MONTH_INDEX)
        .or(months.last())
        .copied()
        .unwrap_or_else(start_month);

    info!(num_records, months = months.len(), "Generating synthetic cloud spend data");

    (0..num_records)
        .map(|_| {
            let invoice_month = *months.choose(rng).unwrap_or(&spike_month);
            let service = *SERVICES.choose(rng).unwrap_or(&"EC2");

            let unit_cost = rng.random_range(0.001..0.5);
            let usage_qty = rng.random_range(10..=5000) as f64;
            let mut cost = usage_qty * unit_cost;

            if invoice_month == spike_month && service == "EC2" && rng.random::<f64>() < 0.3 {
                cost *= rng.random_range(1.5..3.0);
            }

            let optimization_score = (rng.random_range(0.1..0.95_f64) * 100.0).round() / 100.0;

            RawBillingRow {
                invoice_month,
                account_id: format!("ACC-{}", rng.random_range(100..=999)),
                subscription: format!("Sub-{}", SUBSCRIPTIONS.choose(rng).unwrap_or(&"Prod")),
                service: service.to_string(),
                resource_group: format!("RG-{}", rng.random_range(1..=10)),
                resource_id: Some(Uuid::new_v4().to_string()),
                region: REGIONS.choose(rng).unwrap_or(&"us-east-1").to_string(),
                usage_qty,
                unit_cost,
                cost: Some(cost),
                owner: OWNERS.choose(rng).copied().flatten().map(str::to_string),
                env: ENVIRONMENTS.choose(rng).map(|e| e.to_string()),
                tags_json: Some(
                    json!({
                        "Project": format!("P-{}", rng.random_range(1..=5)),
                        "CostCenter": format!("CC-{}", rng.random_range(10..=50)),
                    })
                    .to_string(),
                ),
                optimization_score,
            }
        })
        .collect()
}

/// Drop rows missing a resource id or cost and clip negative costs to zero.
pub fn perform_quality_checks(rows: Vec<RawBillingRow>) -> Vec<RawBillingRow> {
    let before = rows.len();

    let mut cleaned: Vec<RawBillingRow> = rows
        .into_iter()
        .filter(|r| r.resource_id.is_some() && r.cost.is_some())
        .collect();

    let mut clipped = 0;
    for row in cleaned.iter_mut() {
        if let Some(cost) = row.cost.filter(|c| *c < 0.0) {
            warn!(resource_id = ?row.resource_id, cost, "Negative cost found, setting to 0");
            row.cost = Some(0.0);
            clipped += 1;
        }
    }

    info!(
        input = before,
        dropped = before - cleaned.len(),
        clipped,
        remaining = cleaned.len(),
        "Quality checks complete"
    );
    cleaned
}

/// Load checked rows: metadata first (deduplicated by resource id), then
/// the billing rows that reference it.
pub async fn ingest_records(pool: &SqlitePool, rows: Vec<RawBillingRow>) -> Result<IngestSummary> {
    let mut seen = HashSet::new();
    let mut metadata: Vec<ResourceMetadata> = Vec::new();
    let mut records: Vec<BillingRecord> = Vec::with_capacity(rows.len());

    for row in rows {
        let Some((record, meta)) = row.into_parts() else {
            warn!("Skipping row without resource id or cost; run quality checks first");
            continue;
        };
        if seen.insert(meta.resource_id.clone()) {
            metadata.push(meta);
        }
        records.push(record);
    }

    let resource_metadata = billing_queries::insert_resource_metadata(pool, &metadata)
        .await
        .context("Failed to insert resource metadata")?;
    let billing_records = billing_queries::insert_billing_records(pool, &records)
        .await
        .context("Failed to insert billing records")?;

    info!(billing_records, resource_metadata, "Data ingestion finished");

    Ok(IngestSummary {
        billing_records,
        resource_metadata,
    })
}

/// Persist checked rows for the RAG corpus loader.
pub fn write_csv(path: &Path, rows: &[RawBillingRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Wrote billing CSV");
    Ok(())
}

/// Generate, check and load synthetic data when the billing table is empty.
pub async fn seed_if_empty(pool: &SqlitePool, csv_path: &Path) -> Result<Option<IngestSummary>> {
    let existing = billing_queries::count_billing_records(pool).await?;
    if existing > 0 {
        info!(existing, "Billing data already present, skipping synthetic seed");
        return Ok(None);
    }

    let rows = {
        let mut rng = rand::rng();
        generate_synthetic_data(DEFAULT_NUM_RECORDS, DEFAULT_MONTHS_HISTORY, &mut rng)
    };
    let cleaned = perform_quality_checks(rows);
    write_csv(csv_path, &cleaned)?;
    let summary = ingest_records(pool, cleaned).await?;

    Ok(Some(summary))
}
