use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use finops_copilot::app;
use finops_copilot::config::AppConfig;
use finops_copilot::db;
use finops_copilot::logging::{self, LoggingConfig};
use finops_copilot::services::ingestion_service;
use finops_copilot::services::llm_service::OllamaProviderFactory;
use finops_copilot::services::rag_service::RagEngine;
use finops_copilot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    if config.seed_synthetic_data {
        match ingestion_service::seed_if_empty(&pool, &config.rag.billing_csv_path).await? {
            Some(summary) => tracing::info!(
                billing_records = summary.billing_records,
                resource_metadata = summary.resource_metadata,
                "Seeded synthetic billing data"
            ),
            None => tracing::info!("Synthetic seed skipped"),
        }
    }

    if config.rag.llm_base_url.is_none() {
        tracing::warn!("OLLAMA_BASE_URL is not set; chat will report the AI system as offline");
    }

    let rag = Arc::new(RagEngine::new(config.rag.clone(), Arc::new(OllamaProviderFactory)));

    let state = AppState {
        pool,
        rag,
        dashboard_url: config.dashboard_url.clone(),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 FinOps Copilot API running at http://{}/", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
