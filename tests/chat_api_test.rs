//! Chat and RAG admin endpoint tests with an in-process fake model service.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{build_app, get, post_empty, post_json, rag_config, send, test_pool};
use finops_copilot::services::rag_service::RagStatus;

const OLLAMA_URL: &str = "http://host.docker.internal:11434";

#[tokio::test]
async fn test_ask_without_model_service_reports_offline() {
    let dir = tempfile::tempdir().unwrap();
    let (app, rag) = build_app(test_pool().await, rag_config(dir.path(), None), false);

    let (status, body) = send(
        &app,
        post_json("/api/ask", json!({"question": "Why did spend rise?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["sources"], "N/A");
    let answer = body["answer"].as_str().unwrap();
    assert!(answer.starts_with("AI System is temporarily offline."));
    assert!(answer.contains("OLLAMA_BASE_URL"));
    assert!(answer.contains("'mistral'"));
    assert!(matches!(rag.status().await, RagStatus::Failed(_)));
}

#[tokio::test]
async fn test_ask_rejects_unexpected_host() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_app(
        test_pool().await,
        rag_config(dir.path(), Some("http://localhost:11434")),
        false,
    );

    let (status, body) = send(&app, post_json("/api/ask", json!({"question": "Any waste?"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["answer"].as_str().unwrap().contains("host.docker.internal"));
}

#[tokio::test]
async fn test_ask_answers_from_indexed_tips() {
    let dir = tempfile::tempdir().unwrap();
    let config = rag_config(dir.path(), Some(OLLAMA_URL));
    let tips_label = config.tips_path.display().to_string();
    let (app, rag) = build_app(test_pool().await, config, false);

    let (status, body) = send(
        &app,
        post_json("/api/ask", json!({"question": "How do I rightsize EC2?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body["answer"].as_str().unwrap().contains("Rightsize EC2"));

    let sources: Vec<&str> = body["sources"].as_str().unwrap().split(", ").collect();
    assert!(!sources.is_empty());
    assert!(sources.iter().all(|s| *s == tips_label));
    assert_eq!(rag.status().await, RagStatus::Ready);
}

#[tokio::test]
async fn test_generation_failure_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_app(
        test_pool().await,
        rag_config(dir.path(), Some(OLLAMA_URL)),
        true,
    );

    let (status, body) = send(&app, post_json("/api/ask", json!({"question": "Top drivers?"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Internal RAG pipeline error."));
    assert!(detail.contains("connection reset by peer"));
}

#[tokio::test]
async fn test_blank_question_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (app, rag) = build_app(
        test_pool().await,
        rag_config(dir.path(), Some(OLLAMA_URL)),
        false,
    );

    let (status, body) = send(&app, post_json("/api/ask", json!({"question": "   "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().is_some());
    // a rejected request must not trigger initialization
    assert_eq!(rag.status().await, RagStatus::Uninitialized);
}

#[tokio::test]
async fn test_admin_status_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_app(test_pool().await, rag_config(dir.path(), None), false);

    let (_, body) = send(&app, get("/api/admin/rag/status")).await;
    assert_eq!(body, json!({"state": "uninitialized", "error": null}));

    send(&app, post_json("/api/ask", json!({"question": "Hello?"}))).await;

    let (_, body) = send(&app, get("/api/admin/rag/status")).await;
    assert_eq!(body["state"], "failed");
    assert!(body["error"].as_str().unwrap().contains("OLLAMA_BASE_URL"));

    let (status, body) = send(&app, post_empty("/api/admin/rag/reset")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["previous_state"]["state"], "failed");
    assert_eq!(body["state"]["state"], "uninitialized");
}

#[tokio::test]
async fn test_failure_is_cached_until_reset() {
    let dir = tempfile::tempdir().unwrap();
    let (app, rag) = build_app(test_pool().await, rag_config(dir.path(), None), false);

    let (_, first) = send(&app, post_json("/api/ask", json!({"question": "One"}))).await;
    let (_, second) = send(&app, post_json("/api/ask", json!({"question": "Two"}))).await;
    assert_eq!(first["answer"], second["answer"]);

    rag.reset().await;
    assert_eq!(rag.status().await, RagStatus::Uninitialized);
}
