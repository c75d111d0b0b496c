//! HTTP seam between the executors and the network
//!
//! The executors never talk to `reqwest` directly. They go through
//! [`ChatTransport`], which [`HttpTransport`](super::HttpTransport)
//! implements for real endpoints and tests replace with scripted backends.

use super::openai_shared::{ChatCompletionRequest, ChatCompletionResponse};
use crate::config::ModelEndpoint;
use crate::error::CouncilResult;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Raw text lines of a streaming response body, without line terminators.
///
/// An `Err` item means the body could not be read any further.
pub type LineStream = BoxStream<'static, CouncilResult<String>>;

/// Request/response and streaming-response primitives for chat completions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POST a non-streaming request and decode the JSON body
    ///
    /// # Errors
    ///
    /// Network failures, non-2xx statuses and undecodable bodies.
    async fn send_chat(
        &self,
        endpoint: &ModelEndpoint,
        request: &ChatCompletionRequest,
    ) -> CouncilResult<ChatCompletionResponse>;

    /// POST a streaming request and return its body as lines once the
    /// response headers arrived with a success status
    ///
    /// # Errors
    ///
    /// Network failures and non-2xx statuses.
    async fn open_chat_stream(
        &self,
        endpoint: &ModelEndpoint,
        request: &ChatCompletionRequest,
    ) -> CouncilResult<LineStream>;
}
