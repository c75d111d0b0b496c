//! Stream Executor: one model, token deltas, no retry
//!
//! The returned stream is lazy: the request is sent on first poll. It yields
//! zero or more [`StreamEvent::Delta`]s and then exactly one
//! [`StreamEvent::Done`] or [`StreamEvent::Error`]. Dropping it early
//! closes the connection.
//!
//! The request timeout bounds opening the stream and each wait for the
//! next line, so only a stalled connection times out.

use crate::config::ModelEndpoint;
use crate::core_types::{Message, ModelId, StreamEvent};
use crate::error::CouncilError;
use crate::logging::{log_debug, log_warn};
use crate::providers::openai_shared::{parse_sse_line, ChatCompletionRequest, SseLine};
use crate::providers::{ChatTransport, LineStream};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Opens streaming chat completions bounded by a per-read timeout
#[derive(Clone)]
pub struct StreamExecutor {
    transport: Arc<dyn ChatTransport>,
    request_timeout: Duration,
}

impl StreamExecutor {
    pub fn new(transport: Arc<dyn ChatTransport>, request_timeout: Duration) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Stream `model`'s answer to the conversation as events
    pub fn execute(
        &self,
        model: impl Into<ModelId>,
        endpoint: ModelEndpoint,
        messages: &[Message],
    ) -> BoxStream<'static, StreamEvent> {
        let model = model.into();
        let request = ChatCompletionRequest::new(model.clone(), messages).streaming();

        let state = ModelStream {
            model,
            request_timeout: self.request_timeout,
            phase: Phase::Connecting {
                transport: Arc::clone(&self.transport),
                endpoint,
                request,
            },
        };

        futures_util::stream::unfold(state, |mut state| async move {
            let event = state.next_event().await?;
            Some((event, state))
        })
        .boxed()
    }
}

enum Phase {
    Connecting {
        transport: Arc<dyn ChatTransport>,
        endpoint: ModelEndpoint,
        request: ChatCompletionRequest,
    },
    Streaming {
        lines: LineStream,
    },
    Finished,
}

struct ModelStream {
    model: ModelId,
    request_timeout: Duration,
    phase: Phase,
}

impl ModelStream {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Finished => return None,
                Phase::Connecting {
                    transport,
                    endpoint,
                    request,
                } => {
                    log_debug!(model = %self.model, "Opening model stream");

                    match timeout(
                        self.request_timeout,
                        transport.open_chat_stream(&endpoint, &request),
                    )
                    .await
                    {
                        Ok(Ok(lines)) => self.phase = Phase::Streaming { lines },
                        Ok(Err(error)) => return Some(self.fail(error)),
                        Err(_elapsed) => return Some(self.fail(self.timeout_error())),
                    }
                }
                Phase::Streaming { mut lines } => match timeout(
                    self.request_timeout,
                    lines.next(),
                )
                .await
                {
                    Err(_elapsed) => return Some(self.fail(self.timeout_error())),
                    Ok(Some(Err(error))) => return Some(self.fail(error)),
                    Ok(None) => {
                        log_debug!(model = %self.model, "Model stream ended without [DONE]");
                        return Some(self.done());
                    }
                    Ok(Some(Ok(line))) => match parse_sse_line(&line) {
                        SseLine::Delta(content) => {
                            self.phase = Phase::Streaming { lines };
                            return Some(StreamEvent::Delta {
                                model: self.model.clone(),
                                content,
                            });
                        }
                        SseLine::Done => return Some(self.done()),
                        SseLine::Skip => self.phase = Phase::Streaming { lines },
                    },
                },
            }
        }
    }

    fn done(&self) -> StreamEvent {
        log_debug!(model = %self.model, "Model stream completed");
        StreamEvent::Done {
            model: self.model.clone(),
        }
    }

    fn fail(&self, error: CouncilError) -> StreamEvent {
        log_warn!(model = %self.model, error = %error, "Model stream failed");
        StreamEvent::Error {
            model: self.model.clone(),
            message: error.to_string(),
        }
    }

    fn timeout_error(&self) -> CouncilError {
        CouncilError::timeout(self.request_timeout.as_secs())
    }
}
