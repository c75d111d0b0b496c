//! Utility functions and HTTP transport for OpenAI-compatible backends
//!
//! Contains SSE line parsing, body line decoding, response extraction and
//! the `reqwest`-based [`http::HttpTransport`].

use super::types::*;
use crate::core_types::QueryResult;
use crate::error::{CouncilError, CouncilResult};
use crate::providers::transport::LineStream;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::collections::VecDeque;

const SSE_DATA_PREFIX: &str = "data:";
const SSE_DONE_MARKER: &str = "[DONE]";

/// Meaning of one line of a streaming response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// A non-empty content fragment
    Delta(String),
    /// The `[DONE]` sentinel
    Done,
    /// Blank lines, comments, keep-alives, other fields, malformed JSON,
    /// and chunks that carry no content
    Skip,
}

/// Classify one SSE line from a chat completions stream
pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(data) = line.strip_prefix(SSE_DATA_PREFIX) else {
        return SseLine::Skip;
    };
    let data = data.strip_prefix(' ').unwrap_or(data);

    if data.trim() == SSE_DONE_MARKER {
        return SseLine::Done;
    }

    let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(data) else {
        return SseLine::Skip;
    };

    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        Some(content) if !content.is_empty() => SseLine::Delta(content),
        _ => SseLine::Skip,
    }
}

/// Pull content and reasoning out of the first choice
///
/// # Errors
///
/// Returns [`CouncilError::ResponseParsingError`] when there are no choices.
pub fn extract_query_result(response: ChatCompletionResponse) -> CouncilResult<QueryResult> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CouncilError::response_parsing_error("No choices in response"))?;

    Ok(QueryResult {
        content: choice.message.content,
        reasoning_content: choice.message.reasoning_content,
    })
}

/// Splits a byte body into lines
///
/// Bytes are buffered until a `\n` arrives so multi-byte characters split
/// across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feed bytes, returning every line completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(Self::decode(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// The trailing line of a body that did not end with `\n`
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        Some(Self::decode(&raw))
    }

    fn decode(raw: &[u8]) -> String {
        let decoded = String::from_utf8_lossy(raw);
        let line: &str = &decoded;
        line.strip_suffix('\r').unwrap_or(line).to_string()
    }
}

struct LineState<S> {
    body: S,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

/// Turn a chunked byte body into a [`LineStream`]
///
/// A body read error is yielded once as `Err` and ends the stream.
pub fn body_lines<S, B, E>(body: S) -> LineStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = LineState {
        body: Box::pin(body),
        decoder: LineDecoder::default(),
        ready: VecDeque::new(),
        finished: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let lines = state.decoder.push(bytes.as_ref());
                    state.ready.extend(lines);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let error = CouncilError::request_failed(
                        format!("Failed to read response stream: {e}"),
                        Some(Box::new(e)),
                    );
                    return Some((Err(error), state));
                }
                None => {
                    state.finished = true;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

/// Headers for an OpenAI-compatible request
///
/// # Errors
///
/// Returns [`CouncilError::ConfigurationError`] if the key cannot be used
/// as a header value.
pub fn build_auth_headers(api_key: Option<&str>) -> CouncilResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(api_key) = api_key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                CouncilError::configuration_error(format!("Invalid API key format: {e}"))
            })?,
        );
    }

    Ok(headers)
}

/// HTTP transport for OpenAI-compatible backends
pub mod http {
    use super::*;
    use crate::config::ModelEndpoint;
    use crate::logging::{log_debug, log_error};
    use crate::providers::transport::ChatTransport;
    use async_trait::async_trait;

    /// [`ChatTransport`] over a shared `reqwest` connection pool
    #[derive(Debug, Clone, Default)]
    pub struct HttpTransport {
        client: reqwest::Client,
    }

    impl HttpTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Use a preconfigured client (proxies, TLS roots, connect timeouts)
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }

        async fn post(
            &self,
            endpoint: &ModelEndpoint,
            request: &ChatCompletionRequest,
        ) -> CouncilResult<reqwest::Response> {
            let headers = build_auth_headers(endpoint.api_key.as_deref())?;

            log_debug!(
                url = %endpoint.api_url,
                model = %request.model,
                message_count = request.messages.len(),
                stream = request.is_streaming(),
                "Sending chat completion request"
            );

            let response = self
                .client
                .post(&endpoint.api_url)
                .headers(headers)
                .json(request)
                .send()
                .await
                .map_err(|e| {
                    log_error!(
                        url = %endpoint.api_url,
                        error = %e,
                        "HTTP request failed"
                    );
                    CouncilError::request_failed(format!("Request failed: {e}"), Some(Box::new(e)))
                })?;

            if !response.status().is_success() {
                return Err(handle_error_response(response).await);
            }

            Ok(response)
        }
    }

    #[async_trait]
    impl ChatTransport for HttpTransport {
        async fn send_chat(
            &self,
            endpoint: &ModelEndpoint,
            request: &ChatCompletionRequest,
        ) -> CouncilResult<ChatCompletionResponse> {
            let response = self.post(endpoint, request).await?;
            parse_success_response(response).await
        }

        async fn open_chat_stream(
            &self,
            endpoint: &ModelEndpoint,
            request: &ChatCompletionRequest,
        ) -> CouncilResult<LineStream> {
            let response = self.post(endpoint, request).await?;
            Ok(body_lines(response.bytes_stream()))
        }
    }

    /// Handle non-success HTTP responses
    async fn handle_error_response(response: reqwest::Response) -> CouncilError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        log_error!(
            status = %status,
            error_text = %error_text,
            "API error response"
        );

        match status.as_u16() {
            401 | 403 => CouncilError::authentication_failed(format!("{status}: {error_text}")),
            429 => CouncilError::rate_limit_exceeded(retry_after.unwrap_or(60)),
            _ => CouncilError::request_failed(format!("API error {status}: {error_text}"), None),
        }
    }

    /// Parse a successful HTTP response body
    async fn parse_success_response(
        response: reqwest::Response,
    ) -> CouncilResult<ChatCompletionResponse> {
        let raw_body = response.text().await.map_err(|e| {
            CouncilError::response_parsing_error(format!("Failed to read response: {e}"))
        })?;

        serde_json::from_str(&raw_body).map_err(|e| {
            log_error!(
                error = %e,
                raw_body = %raw_body,
                "Failed to parse response"
            );
            CouncilError::response_parsing_error(format!("Invalid response: {e}"))
        })
    }
}
