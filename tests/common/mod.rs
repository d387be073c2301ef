#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;
use url::Url;

use finops_copilot::app::create_app;
use finops_copilot::config::RagConfig;
use finops_copilot::db;
use finops_copilot::errors::LlmError;
use finops_copilot::models::RawBillingRow;
use finops_copilot::services::ingestion_service;
use finops_copilot::services::llm_service::{LlmConfig, LlmProvider, ProviderFactory};
use finops_copilot::services::rag_service::RagEngine;
use finops_copilot::state::AppState;

pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    db::migrate(&pool).await.expect("migrations");
    pool
}

pub fn month(year: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, m, 1).unwrap()
}

pub fn row(
    invoice_month: NaiveDate,
    resource_id: &str,
    service: &str,
    cost: f64,
    optimization_score: f64,
) -> RawBillingRow {
    RawBillingRow {
        invoice_month,
        account_id: "ACC-100".to_string(),
        subscription: "Sub-Prod".to_string(),
        service: service.to_string(),
        resource_group: "RG-1".to_string(),
        resource_id: Some(resource_id.to_string()),
        region: "us-east-1".to_string(),
        usage_qty: 100.0,
        unit_cost: cost / 100.0,
        cost: Some(cost),
        owner: Some("alice".to_string()),
        env: Some("prod".to_string()),
        tags_json: Some("{}".to_string()),
        optimization_score,
    }
}

pub async fn seed(pool: &SqlitePool, rows: Vec<RawBillingRow>) {
    let cleaned = ingestion_service::perform_quality_checks(rows);
    ingestion_service::ingest_records(pool, cleaned)
        .await
        .expect("ingest rows");
}

/// Letter-frequency embeddings and a canned answer
pub struct FakeProvider {
    pub fail_generation: bool,
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
        if self.fail_generation {
            return Err(LlmError::NetworkError("connection reset by peer".to_string()));
        }
        let context_lines = prompt.lines().count();
        Ok(format!(
            "Spend is concentrated in compute ({} prompt lines).\n- Rightsize EC2\n- Schedule dev shutdowns",
            context_lines
        ))
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.01f32; 26];
                for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                    v[(c - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

pub struct FakeFactory {
    pub fail_generation: bool,
}

#[async_trait]
impl ProviderFactory for FakeFactory {
    async fn connect(&self, _base_url: &Url, _config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        Ok(Arc::new(FakeProvider {
            fail_generation: self.fail_generation,
        }))
    }
}

/// RAG settings pointing at a temp directory with a small tips file
pub fn rag_config(dir: &Path, base_url: Option<&str>) -> RagConfig {
    let tips_path = dir.join("finops_tips.md");
    std::fs::write(
        &tips_path,
        "# Compute\n\nRightsize EC2 instances with low utilization.\n\n# Storage\n\nMove cold S3 data to archive tiers.",
    )
    .unwrap();

    RagConfig {
        llm_base_url: base_url.map(str::to_string),
        vector_store_path: dir.join("vector_store").join("chunks.db"),
        tips_path,
        billing_csv_path: dir.join("synthetic_data.csv"),
        ..RagConfig::default()
    }
}

pub fn build_app(pool: SqlitePool, rag_config: RagConfig, fail_generation: bool) -> (Router, Arc<RagEngine>) {
    let rag = Arc::new(RagEngine::new(
        rag_config,
        Arc::new(FakeFactory { fail_generation }),
    ));
    let state = AppState {
        pool,
        rag: rag.clone(),
        dashboard_url: "http://localhost:8501".to_string(),
    };
    (create_app(state), rag)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}
