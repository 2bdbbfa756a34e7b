//! Chat endpoint contract tests
//!
//! Verify the exact HTTP exchange of `HttpFetcher` against a mock server:
//! request shape and headers, response parsing, and the mapping of every
//! failure mode into a `FetchFailure`. The fetcher is blocking, so each call
//! runs on `spawn_blocking` while the mock server lives on the test runtime.

use std::time::Duration;

use proactive_daemon::config::Config;
use proactive_daemon::constants::{DEFAULT_MODEL, ERROR_BODY_LOG_CHARS, SYSTEM_PROMPT, USER_PROMPT};
use proactive_daemon::fetcher::{FetchFailure, FetchOutcome, HttpFetcher, MessageFetcher};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    Config {
        api_key: Some("test-key".into()),
        api_url: Some(format!("{}/v1/chat/completions", server.uri())),
        ..Config::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

async fn fetch(fetcher: HttpFetcher, config: Config) -> FetchOutcome {
    tokio::task::spawn_blocking(move || fetcher.fetch(&config))
        .await
        .unwrap()
}

// ────────────────────────────────────────────────────────────────────────────
// Request format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_carries_bearer_and_prompts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "model": DEFAULT_MODEL,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": USER_PROMPT}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi darling")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = fetch(HttpFetcher::new(), config_for(&mock_server)).await;
    assert_eq!(outcome, FetchOutcome::Success("Hi darling".into()));
}

#[tokio::test]
async fn test_request_uses_configured_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"model": "llama-3.1-8b"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = Config {
        model: Some("llama-3.1-8b".into()),
        ..config_for(&mock_server)
    };
    let outcome = fetch(HttpFetcher::new(), config).await;
    assert_eq!(outcome, FetchOutcome::Success("ok".into()));
}

// ────────────────────────────────────────────────────────────────────────────
// Response parsing
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_content_is_trimmed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("\n  miss you already  \n")))
        .mount(&mock_server)
        .await;

    let outcome = fetch(HttpFetcher::new(), config_for(&mock_server)).await;
    assert_eq!(outcome, FetchOutcome::Success("miss you already".into()));
}

#[tokio::test]
async fn test_missing_choices_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&mock_server)
        .await;

    let outcome = fetch(HttpFetcher::new(), config_for(&mock_server)).await;
    assert!(matches!(outcome, FetchOutcome::Failure(FetchFailure::Malformed(_))));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&mock_server)
        .await;

    let outcome = fetch(HttpFetcher::new(), config_for(&mock_server)).await;
    assert!(matches!(outcome, FetchOutcome::Failure(FetchFailure::Malformed(_))));
}

// ────────────────────────────────────────────────────────────────────────────
// Error mapping
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_maps_to_remote() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let outcome = fetch(HttpFetcher::new(), config_for(&mock_server)).await;
    assert_eq!(
        outcome,
        FetchOutcome::Failure(FetchFailure::Remote {
            status: 500,
            body: "upstream exploded".into(),
        })
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_remote_with_truncated_body() {
    let mock_server = MockServer::start().await;
    let long_body = "x".repeat(ERROR_BODY_LOG_CHARS * 2);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(long_body))
        .mount(&mock_server)
        .await;

    match fetch(HttpFetcher::new(), config_for(&mock_server)).await {
        FetchOutcome::Failure(FetchFailure::Remote { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body.len(), ERROR_BODY_LOG_CHARS);
        }
        other => panic!("expected Remote failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_endpoint_maps_to_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::with_timeouts(Duration::from_secs(2), Duration::from_millis(300));
    let outcome = fetch(fetcher, config_for(&mock_server)).await;
    assert!(
        matches!(outcome, FetchOutcome::Failure(FetchFailure::Timeout(_))),
        "expected Timeout, got {:?}",
        outcome
    );
}
