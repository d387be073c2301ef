use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the retrieval-augmented chat engine
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Base URL of the Ollama-compatible model service. Missing is not fatal
    /// at startup; it fails RAG initialization instead.
    pub llm_base_url: Option<String>,
    /// Host the model service URL must point at. `None` accepts any host.
    pub expected_llm_host: Option<String>,
    pub model: String,
    pub embedding_model: String,
    pub request_timeout: Duration,
    pub vector_store_path: PathBuf,
    pub tips_path: PathBuf,
    pub billing_csv_path: PathBuf,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Number of billing rows rendered into the data summary document
    pub summary_rows: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            llm_base_url: None,
            expected_llm_host: Some("host.docker.internal".to_string()),
            model: "mistral".to_string(),
            embedding_model: "all-minilm".to_string(),
            request_timeout: Duration::from_secs(120),
            vector_store_path: PathBuf::from("./vector_store/chunks.db"),
            tips_path: PathBuf::from("data/finops_tips.md"),
            billing_csv_path: PathBuf::from("data/synthetic_data.csv"),
            top_k: 4,
            chunk_size: 1000,
            chunk_overlap: 150,
            summary_rows: 50,
        }
    }
}

impl RagConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let expected_llm_host = match std::env::var("OLLAMA_EXPECTED_HOST") {
            Ok(host) if host.trim().is_empty() => None,
            Ok(host) => Some(host.trim().to_string()),
            Err(_) => defaults.expected_llm_host,
        };

        Self {
            llm_base_url: std::env::var("OLLAMA_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            expected_llm_host,
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            embedding_model: std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            request_timeout: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            vector_store_path: std::env::var("VECTOR_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vector_store_path),
            tips_path: std::env::var("FINOPS_TIPS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tips_path),
            billing_csv_path: std::env::var("BILLING_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.billing_csv_path),
            top_k: std::env::var("RAG_TOP_K")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.top_k),
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("RAG_TOP_K must be at least 1".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        Ok(())
    }
}

/// Process-wide settings, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub dashboard_url: String,
    pub seed_synthetic_data: bool,
    pub rag: RagConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8000);

        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://sql_app.db?mode=rwc".to_string()),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            dashboard_url: std::env::var("DASHBOARD_URL")
                .unwrap_or_else(|_| "http://localhost:8501".to_string()),
            seed_synthetic_data: std::env::var("SEED_SYNTHETIC_DATA")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            rag: RagConfig::from_env(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("DATABASE_URL must not be empty".to_string());
        }
        self.rag.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_config_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.model, "mistral");
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 150);
        assert_eq!(config.summary_rows, 50);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.expected_llm_host.as_deref(), Some("host.docker.internal"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_larger_than_chunk() {
        let config = RagConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..RagConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
