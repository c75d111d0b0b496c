//! Integration Tests for the HTTP Transport
//!
//! UNIT UNDER TEST: HttpTransport
//!
//! BUSINESS RESPONSIBILITY:
//!   - POST chat completion requests with bearer authentication
//!   - Map HTTP failures onto CouncilError variants
//!   - Deliver streaming bodies line by line
//!
//! TEST COVERAGE:
//!   - Request headers and JSON body
//!   - Successful non-streaming response parsing
//!   - 401, 429 (with and without retry-after) and 500 mapping
//!   - Malformed success bodies
//!   - SSE body delivered as lines
//!   - Unreachable host

mod common;

use common::{chat_completion_body, model_path, sse_body};
use futures_util::StreamExt;
use llm_council::providers::openai_shared::ChatCompletionRequest;
use llm_council::{ChatTransport, CouncilError, HttpTransport, Message, ModelEndpoint};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint(server: &MockServer) -> ModelEndpoint {
    ModelEndpoint::new(format!("{}{}", server.uri(), model_path("m1")), "test-key")
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new("m1", &[Message::user("Hello")])
}

// ============================================================================
// Non-streaming Requests
// ============================================================================

#[tokio::test]
async fn test_send_chat_posts_authenticated_json() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(model_path("m1")))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "model": "m1",
            "messages": [{ "role": "user", "content": "Hello" }],
            "reasoning_effort": "high"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("Hi!")))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let response = HttpTransport::new()
        .send_chat(&endpoint(&server), &request())
        .await
        .expect("request should succeed");

    // Assert
    assert_eq!(response.choices.len(), 1);
    assert_eq!(response.choices[0].message.content.as_deref(), Some("Hi!"));
}

#[tokio::test]
async fn test_send_chat_without_key_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("ok")))
        .mount(&server)
        .await;
    let endpoint = ModelEndpoint {
        api_url: format!("{}{}", server.uri(), model_path("m1")),
        api_key: None,
    };

    HttpTransport::new()
        .send_chat(&endpoint, &request())
        .await
        .expect("request should succeed");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = HttpTransport::new()
        .send_chat(&endpoint(&server), &request())
        .await
        .unwrap_err();

    assert!(matches!(err, CouncilError::AuthenticationFailed { .. }), "got {err:?}");
    assert!(err.to_string().contains("invalid api key"));
}

#[tokio::test]
async fn test_rate_limit_uses_retry_after_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = HttpTransport::new()
        .send_chat(&endpoint(&server), &request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CouncilError::RateLimitExceeded {
            retry_after_seconds: 7
        }
    ));
}

#[tokio::test]
async fn test_rate_limit_defaults_to_sixty_seconds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = HttpTransport::new()
        .send_chat(&endpoint(&server), &request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CouncilError::RateLimitExceeded {
            retry_after_seconds: 60
        }
    ));
}

#[tokio::test]
async fn test_server_error_maps_to_request_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = HttpTransport::new()
        .send_chat(&endpoint(&server), &request())
        .await
        .unwrap_err();

    assert!(matches!(err, CouncilError::RequestFailed { .. }));
    let text = err.to_string();
    assert!(text.contains("500") && text.contains("upstream exploded"), "got: {text}");
}

#[tokio::test]
async fn test_malformed_success_body_is_a_parsing_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = HttpTransport::new()
        .send_chat(&endpoint(&server), &request())
        .await
        .unwrap_err();

    assert!(matches!(err, CouncilError::ResponseParsingError { .. }));
}

#[tokio::test]
async fn test_unreachable_host_is_request_failed() {
    // Port 9 (discard) on localhost is not listening in test environments
    let endpoint = ModelEndpoint::new("http://127.0.0.1:9/v1/chat/completions", "k");

    let err = HttpTransport::new()
        .send_chat(&endpoint, &request())
        .await
        .unwrap_err();

    assert!(matches!(err, CouncilError::RequestFailed { .. }));
}

// ============================================================================
// Streaming Requests
// ============================================================================

#[tokio::test]
async fn test_open_chat_stream_yields_body_lines() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "stream": true })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["Hel", "lo"], true), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let lines: Vec<String> = HttpTransport::new()
        .open_chat_stream(&endpoint(&server), &request().streaming())
        .await
        .expect("stream should open")
        .map(|line| line.expect("line should read"))
        .collect()
        .await;

    // Assert
    let data_lines: Vec<&String> = lines.iter().filter(|l| l.starts_with("data:")).collect();
    assert_eq!(data_lines.len(), 4, "role chunk, two deltas and [DONE]: {lines:?}");
    assert_eq!(data_lines.last().map(|l| l.as_str()), Some("data: [DONE]"));
    assert!(
        lines.iter().all(|l| !l.ends_with('\r')),
        "CRLF endings should be stripped"
    );
}

#[tokio::test]
async fn test_open_chat_stream_reports_http_errors_before_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let result = HttpTransport::new()
        .open_chat_stream(&endpoint(&server), &request().streaming())
        .await;

    assert!(matches!(result, Err(CouncilError::AuthenticationFailed { .. })));
}
