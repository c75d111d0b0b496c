//! Test helper utilities for llm-council integration tests
//!
//! Every model gets its own path on one wiremock server so a test can
//! script each model independently.
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

// Allow dead code in test utilities - functions are used across different test files
#![allow(dead_code)]

use llm_council::{CouncilConfig, ModelEndpoint, RetryPolicy};
use std::time::Duration;
use wiremock::{MockServer, ResponseTemplate};

/// Path a model's endpoint is served on
pub fn model_path(model: &str) -> String {
    format!("/{model}/v1/chat/completions")
}

/// Configuration pointing every model at `server`, with all of them on the council
pub fn council_config(server: &MockServer, models: &[&str]) -> CouncilConfig {
    models
        .iter()
        .fold(CouncilConfig::new(), |config, model| {
            config.with_model(
                *model,
                ModelEndpoint::new(
                    format!("{}{}", server.uri(), model_path(model)),
                    format!("test-key-{model}"),
                ),
            )
        })
        .with_council(models.iter().copied())
}

/// Three immediate attempts with a short per-call timeout
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        request_timeout: Duration::from_secs(2),
        ..RetryPolicy::default()
    }
}

pub fn chat_completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

/// SSE body streaming `deltas`, optionally terminated by `[DONE]`
pub fn sse_body(deltas: &[&str], with_done: bool) -> String {
    let mut body = String::from(": connected\n\n");
    body.push_str(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    );
    for delta in deltas {
        let chunk = serde_json::json!({
            "choices": [{ "index": 0, "delta": { "content": delta } }]
        });
        body.push_str(&format!("data: {chunk}\r\n\r\n"));
    }
    if with_done {
        body.push_str("data: [DONE]\n\n");
    }
    body
}

pub fn sse_response(deltas: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(deltas, true), "text/event-stream")
}
