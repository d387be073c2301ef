use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::errors::LlmError;

/// Model names and limits for the model service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub embedding_model: String,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "mistral".to_string(),
            embedding_model: "all-minilm".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError>;

    /// Embed each input text, preserving order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError>;
}

/// Builds providers once the service endpoint has been validated.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn connect(&self, base_url: &Url, config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama HTTP API provider
pub struct OllamaProvider {
    base_url: Url,
    model: String,
    embedding_model: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: Url, config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: with_trailing_slash(base_url),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, LlmError> {
        self.base_url
            .join(path)
            .map_err(|e| LlmError::NetworkError(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LlmError> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError(format!("HTTP {}: {}", status, error_text)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

/// Make `base` safe to `join` relative API paths onto: a path prefix such
/// as `/ollama` becomes `/ollama/` so it is kept instead of replaced.
pub fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn classify_transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::NetworkError(e.to_string())
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
        info!(model = %self.model, prompt_chars = prompt.len(), "Generating LLM completion");

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response: GenerateResponse = self.post_json("api/generate", &request).await?;

        if let (Some(prompt_tokens), Some(completion_tokens)) =
            (response.prompt_eval_count, response.eval_count)
        {
            info!(prompt_tokens, completion_tokens, "LLM completion generated");
        }

        Ok(response.response)
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let response: EmbedResponse = self.post_json("api/embed", &request).await?;

        if response.embeddings.len() != expected {
            warn!(expected, got = response.embeddings.len(), "Embedding count mismatch");
            return Err(LlmError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                expected,
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}

/// Connects to an Ollama server over HTTP
#[derive(Debug, Default, Clone)]
pub struct OllamaProviderFactory;

#[async_trait]
impl ProviderFactory for OllamaProviderFactory {
    async fn connect(&self, base_url: &Url, config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        info!(base_url = %base_url, model = %config.model, "Connecting to Ollama model service");
        let provider = OllamaProvider::new(base_url.clone(), config)?;
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer, timeout: Duration) -> OllamaProvider {
        let config = LlmConfig {
            timeout,
            ..LlmConfig::default()
        };
        OllamaProvider::new(Url::parse(&server.uri()).unwrap(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_generate_completion_reads_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"model": "mistral", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "mistral",
                "response": "Shut down idle dev instances.",
                "done": true,
                "prompt_eval_count": 120,
                "eval_count": 30
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Duration::from_secs(5));
        let answer = provider.generate_completion("hi".to_string()).await.unwrap();
        assert_eq!(answer, "Shut down idle dev instances.");
    }

    #[tokio::test]
    async fn test_embed_returns_vectors_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(json!({"model": "all-minilm"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "all-minilm",
                "embeddings": [[1.0, 0.0], [0.0, 1.0]]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Duration::from_secs(5));
        let vectors = provider
            .embed(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_embed_count_mismatch_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[1.0, 0.0]]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Duration::from_secs(5));
        let result = provider.embed(vec!["a".to_string(), "b".to_string()]).await;
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_http_error_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model 'mistral' not found"))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Duration::from_secs(5));
        let result = provider.generate_completion("hi".to_string()).await;
        match result {
            Err(LlmError::ApiError(msg)) => assert!(msg.contains("not found")),
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server, Duration::from_millis(200));
        let result = provider.generate_completion("hi".to_string()).await;
        assert_eq!(result, Err(LlmError::Timeout));
    }

    #[test]
    fn test_trailing_slash_keeps_path_prefix() {
        let base = with_trailing_slash(Url::parse("http://host.docker.internal:11434/ollama").unwrap());
        assert_eq!(base.path(), "/ollama/");
        assert_eq!(base.join("api/generate").unwrap().path(), "/ollama/api/generate");

        let root = with_trailing_slash(Url::parse("http://host.docker.internal:11434").unwrap());
        assert_eq!(root.join("api/embed").unwrap().path(), "/api/embed");
    }

    #[tokio::test]
    async fn test_requests_keep_base_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ollama/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "proxied"})))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/ollama", server.uri())).unwrap();
        let provider = OllamaProvider::new(base, &LlmConfig::default()).unwrap();
        let answer = provider.generate_completion("hi".to_string()).await.unwrap();
        assert_eq!(answer, "proxied");
    }

    #[tokio::test]
    async fn test_empty_embed_skips_request() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, Duration::from_secs(5));
        assert!(provider.embed(Vec::new()).await.unwrap().is_empty());
    }
}
