use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("RAG error: {0}")]
    Rag(RagError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, detail) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Db(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            AppError::Rag(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Internal RAG pipeline error. Please check the Ollama server logs. Error: {}",
                    e
                ),
            ),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<RagError> for AppError {
    fn from(value: RagError) -> Self {
        AppError::Rag(value)
    }
}

/// Failures talking to the model service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    #[error("Request to model service timed out")]
    Timeout,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Model service error: {0}")]
    ApiError(String),
    #[error("Invalid response from model service: {0}")]
    InvalidResponse(String),
}

/// Errors raised while building or querying the RAG pipeline.
///
/// `Clone` so a failed initialization can be handed to every later caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RagError {
    #[error("{0}")]
    Configuration(String),
    #[error("RAG Initialization Failed: {0}")]
    Initialization(String),
    #[error("Vector store error: {0}")]
    VectorStore(String),
    #[error(transparent)]
    Model(#[from] LlmError),
}

impl From<sqlx::Error> for RagError {
    fn from(value: sqlx::Error) -> Self {
        RagError::VectorStore(value.to_string())
    }
}
