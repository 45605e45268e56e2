#![allow(clippy::unwrap_used, clippy::expect_used)]

//! ChatExecutor against a mock chat completions server.

use crewforge_agent::{
    ChatExecutor, LlmProvider, ModelConfig, RetryPolicy, TaskRequest, WorkerExecutor,
    WorkerProfile, WorkerRole,
};
use crewforge_core::ToolHandle;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ModelConfig {
    with_timeout(server, 5_000)
}

fn with_timeout(server: &MockServer, request_timeout_ms: u64) -> ModelConfig {
    ModelConfig {
        provider: LlmProvider::OpenAi,
        model_id: "test-model".to_string(),
        api_key: "test-key".to_string(),
        api_base_url: Some(server.uri()),
        temperature: 0.7,
        max_tokens: 100,
        request_timeout_ms,
        retry_policy: RetryPolicy {
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        },
    }
}

fn profile(max_retries: u32) -> WorkerProfile {
    WorkerProfile {
        role: WorkerRole::TrendScout,
        title: "Viral Trend Scout".to_string(),
        goal: "Discover trends".to_string(),
        backstory: "An expert trend analyst.".to_string(),
        tools: vec![ToolHandle::new("ddg_search", "General web search")],
        max_iterations: 3,
        max_retries,
    }
}

fn request() -> TaskRequest {
    TaskRequest {
        description: "Discover trending content for tech".to_string(),
        expected_output: "Trend report".to_string(),
        context: Some("earlier output".to_string()),
    }
}

fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": text }, "finish_reason": "stop" }]
    }))
}

#[tokio::test]
async fn test_execute_returns_assistant_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("Context from previous tasks"))
        .and(body_string_contains("ddg_search"))
        .respond_with(completion("three trends"))
        .expect(1)
        .mount(&server)
        .await;

    let executor = ChatExecutor::new(config(&server)).unwrap();
    let output = executor.execute(&profile(2), &request()).await.unwrap();
    assert_eq!(output, "three trends");
}

#[tokio::test]
async fn test_execute_retries_transient_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(completion("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let executor = ChatExecutor::new(config(&server)).unwrap();
    let output = executor.execute(&profile(2), &request()).await.unwrap();
    assert_eq!(output, "recovered");
}

#[tokio::test]
async fn test_execute_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let executor = ChatExecutor::new(config(&server)).unwrap();
    let err = executor.execute(&profile(1), &request()).await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_execute_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let executor = ChatExecutor::new(config(&server)).unwrap();
    let err = executor.execute(&profile(2), &request()).await.unwrap_err();
    assert!(err.to_string().contains("bad request"));
}

#[tokio::test]
async fn test_execute_retries_server_error_whose_body_mentions_a_client_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503).set_body_string("overloaded, retry in 4000ms (code 400)"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let executor = ChatExecutor::new(config(&server)).unwrap();
    let err = executor.execute(&profile(2), &request()).await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_execute_does_not_retry_client_error_whose_body_mentions_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("timeout 500 is out of range"))
        .expect(1)
        .mount(&server)
        .await;

    let executor = ChatExecutor::new(config(&server)).unwrap();
    let err = executor.execute(&profile(2), &request()).await.unwrap_err();
    assert!(err.to_string().contains("422"));
}

#[tokio::test]
async fn test_execute_retries_slow_backend_then_surfaces_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("too late").set_delay(Duration::from_secs(2)))
        .expect(2)
        .mount(&server)
        .await;

    let executor = ChatExecutor::new(with_timeout(&server, 200)).unwrap();
    let started = Instant::now();
    let err = executor.execute(&profile(1), &request()).await.unwrap_err();

    assert!(err.to_string().contains("timeout"), "unexpected error: {err}");
    assert!(started.elapsed() < Duration::from_secs(2));
}
