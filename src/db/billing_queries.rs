use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::models::{BillingRecord, CostDriver, MonthlySpend, ResourceMetadata};

/// Total cost per month for the `months` most recent distinct invoice months,
/// oldest first. Empty when the table has no rows.
pub async fn fetch_recent_monthly_spend(
    pool: &SqlitePool,
    months: i64,
) -> Result<Vec<MonthlySpend>, sqlx::Error> {
    sqlx::query_as::<_, MonthlySpend>(
        r#"
        SELECT invoice_month, SUM(cost) AS total_cost
        FROM billing_records
        WHERE invoice_month IN (
            SELECT DISTINCT invoice_month
            FROM billing_records
            ORDER BY invoice_month DESC
            LIMIT ?
        )
        GROUP BY invoice_month
        ORDER BY invoice_month ASC
        "#,
    )
    .bind(months)
    .fetch_all(pool)
    .await
}

/// Sum of cost * optimization_score over every record, regardless of month.
pub async fn fetch_savings_opportunity(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
    let (total,): (Option<f64>,) = sqlx::query_as(
        "SELECT SUM(cost * optimization_score) FROM billing_records",
    )
    .fetch_one(pool)
    .await?;

    Ok(total.unwrap_or(0.0))
}

/// Spend in `month` on rows whose optimization score is below `score_threshold`.
pub async fn fetch_waste_for_month(
    pool: &SqlitePool,
    month: NaiveDate,
    score_threshold: f64,
) -> Result<f64, sqlx::Error> {
    let (total,): (Option<f64>,) = sqlx::query_as(
        r#"
        SELECT SUM(cost)
        FROM billing_records
        WHERE optimization_score < ?
          AND invoice_month = ?
        "#,
    )
    .bind(score_threshold)
    .bind(month)
    .fetch_one(pool)
    .await?;

    Ok(total.unwrap_or(0.0))
}

/// Services ranked by summed cost within `month`. Ties keep first-seen order.
pub async fn fetch_top_services_for_month(
    pool: &SqlitePool,
    month: NaiveDate,
    limit: i64,
) -> Result<Vec<CostDriver>, sqlx::Error> {
    sqlx::query_as::<_, CostDriver>(
        r#"
        SELECT service, SUM(cost) AS cost
        FROM billing_records
        WHERE invoice_month = ?
        GROUP BY service
        ORDER BY SUM(cost) DESC, MIN(id) ASC
        LIMIT ?
        "#,
    )
    .bind(month)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count_billing_records(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM billing_records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Insert metadata rows in a single transaction. Resource ids must be unique.
pub async fn insert_resource_metadata(
    pool: &SqlitePool,
    rows: &[ResourceMetadata],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for row in rows {
        let result = sqlx::query(
            "INSERT INTO resource_metadata (resource_id, owner, env, tags_json)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&row.resource_id)
        .bind(&row.owner)
        .bind(&row.env)
        .bind(&row.tags_json)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Insert billing rows in a single transaction. Their metadata must exist.
pub async fn insert_billing_records(
    pool: &SqlitePool,
    rows: &[BillingRecord],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for row in rows {
        let result = sqlx::query(
            "INSERT INTO billing_records (
                invoice_month, account_id, subscription, service, resource_group,
                resource_id, region, usage_qty, unit_cost, cost, optimization_score
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.invoice_month)
        .bind(&row.account_id)
        .bind(&row.subscription)
        .bind(&row.service)
        .bind(&row.resource_group)
        .bind(&row.resource_id)
        .bind(&row.region)
        .bind(row.usage_qty)
        .bind(row.unit_cost)
        .bind(row.cost)
        .bind(row.optimization_score)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}
