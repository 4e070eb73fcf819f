//! HTTP contract tests for the Ollama backend, using a local mock server.
//!
//! These verify the wire format both ways: what we send to `/api/embed` and
//! `/api/chat`, and how responses and failures map onto the error taxonomy.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use faultline_core::{EmbeddingBackend, Error, GenerationBackend, InferenceBackend};
use faultline_inference::OllamaBackend;

fn backend_for(server: &MockServer) -> OllamaBackend {
    OllamaBackend::with_config(
        server.uri(),
        "mxbai-embed-large".to_string(),
        "llama3".to_string(),
        3,
    )
}

#[tokio::test]
async fn embed_sends_model_and_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "mxbai-embed-large",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "mxbai-embed-large",
            "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let vectors = backend
        .embed_texts(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].as_slice(), &[0.1, 0.2, 0.3]);
    assert_eq!(vectors[1].as_slice(), &[0.4, 0.5, 0.6]);
}

#[tokio::test]
async fn embed_maps_server_error_to_embedding_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .embed_texts(&["anything".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Embedding(_)));
    let message = err.to_string();
    assert!(message.contains("500"));
    assert!(message.contains("model not loaded"));
}

#[tokio::test]
async fn embed_rejects_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .embed_texts(&["anything".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Embedding(_)));
    assert!(err.to_string().contains("parse"));
}

#[tokio::test]
async fn embed_rejects_count_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2, 0.3]]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .embed_texts(&["one".to_string(), "two".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Embedding(_)));
    assert!(err.to_string().contains("expected 2 embeddings, got 1"));
}

#[tokio::test]
async fn generate_sends_system_and_user_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "stream": false,
            "messages": [
                {"role": "system", "content": "Be terse."},
                {"role": "user", "content": "Why is the VPN down?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "Routing loop."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let answer = backend
        .generate_with_system("Be terse.", "Why is the VPN down?")
        .await
        .unwrap();

    assert_eq!(answer, "Routing loop.");
}

#[tokio::test]
async fn generate_without_system_sends_single_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "hi"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    assert_eq!(backend.generate("hello").await.unwrap(), "hi");
}

#[tokio::test]
async fn generate_maps_server_error_to_chat_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.generate("hello").await.unwrap_err();

    assert!(matches!(err, Error::Chat(_)));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn health_check_reports_server_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    assert!(backend.health_check().await.unwrap());
}

#[tokio::test]
async fn health_check_survives_unreachable_server() {
    // Point at a closed port; the probe reports false instead of erroring.
    let backend = OllamaBackend::with_config(
        "http://127.0.0.1:1".to_string(),
        "m".to_string(),
        "g".to_string(),
        3,
    );
    assert!(!backend.health_check().await.unwrap());
}
