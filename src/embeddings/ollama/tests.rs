use super::*;
use crate::config::OllamaConfig;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let address = server.address();
    Config {
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            batch_size: 2,
            ..OllamaConfig::default()
        },
        ..Config::default()
    }
}

#[test]
fn client_configuration() {
    let config = Config {
        ollama: OllamaConfig {
            host: "test-host".to_string(),
            port: 1234,
            embedding_model: "test-embed".to_string(),
            chat_model: "test-chat".to_string(),
            batch_size: 128,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    let client = OllamaClient::new(&config).expect("should create client");

    assert_eq!(client.embedding_model, "test-embed");
    assert_eq!(client.chat_model, "test-chat");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&Config::default())
        .expect("should create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);
    assert_eq!(client.retry_attempts, 5);

    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_embeddings_are_split_and_ordered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(serde_json::json!({"input": ["one", "two"]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"embeddings": [[1.0, 0.0], [2.0, 0.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(serde_json::json!({"input": ["three"]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"embeddings": [[3.0, 0.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("should create client");
    let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
    let vectors = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task should not panic")
        .expect("embedding should succeed");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"embeddings": []})),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("should create client");
    let result = tokio::task::spawn_blocking(move || client.embed("hello"))
        .await
        .expect("task should not panic");

    assert!(matches!(result, Err(DocQaError::Embedding(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_uses_chat_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.2:latest",
            "stream": false,
            "messages": [{"role": "user", "content": "Say hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama3.2:latest",
            "message": {"role": "assistant", "content": "hi"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("should create client");
    let reply = tokio::task::spawn_blocking(move || client.complete("Say hi"))
        .await
        .expect("task should not panic")
        .expect("completion should succeed");

    assert_eq!(reply, "hi");
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server))
        .expect("should create client")
        .with_retry_attempts(3);
    let result = tokio::task::spawn_blocking(move || client.complete("anything"))
        .await
        .expect("task should not panic");

    assert!(matches!(result, Err(DocQaError::Model(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_requires_both_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "nomic-embed-text:latest"}]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("should create client");
    let result = tokio::task::spawn_blocking(move || {
        let models = client.list_models()?;
        client.health_check().map(|()| models)
    })
    .await
    .expect("task should not panic");

    let error = result.expect_err("chat model is missing");
    assert!(format!("{error:#}").contains("llama3.2:latest"));
}
