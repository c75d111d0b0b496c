//! Test helper utilities for llm-council unit tests
//!
//! `ScriptedTransport` stands in for the network: each model gets a queue of
//! batch replies and a stream script, with optional delays so tests can
//! observe concurrency under tokio's paused clock.
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

#![allow(dead_code)]

use crate::config::{CouncilConfig, ModelEndpoint};
use crate::core_types::StreamEvent;
use crate::error::{CouncilError, CouncilResult};
use crate::providers::openai_shared::{ChatCompletionRequest, ChatCompletionResponse};
use crate::providers::{ChatTransport, LineStream};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Configuration with one endpoint per model name, all on a fake host
pub fn create_test_config(models: &[&str]) -> CouncilConfig {
    models.iter().fold(CouncilConfig::new(), |config, model| {
        config.with_model(
            *model,
            ModelEndpoint::new(
                format!("http://{model}.test/v1/chat/completions"),
                format!("key-{model}"),
            ),
        )
    })
}

/// Three immediate attempts with a short per-call timeout
pub fn create_fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        request_timeout: Duration::from_secs(5),
        ..RetryPolicy::default()
    }
}

pub fn chat_response(content: &str) -> ChatCompletionResponse {
    serde_json::from_value(serde_json::json!({
        "choices": [{
            "message": { "role": "assistant", "content": content }
        }]
    }))
    .expect("valid chat completion response")
}

pub fn delta_line(content: &str) -> String {
    format!(
        "data: {}",
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

/// One scripted reply to `send_chat`
#[derive(Debug, Clone)]
pub enum BatchReply {
    Answer {
        content: String,
        reasoning: Option<String>,
        delay: Duration,
    },
    Fail {
        delay: Duration,
    },
    /// Never answers; only a timeout ends the attempt
    Hang,
}

#[derive(Debug, Clone)]
enum ScriptLine {
    Line(String),
    ReadError(String),
}

/// Behaviour of one model's streaming endpoint
#[derive(Debug, Clone, Default)]
pub struct StreamScript {
    open_delay: Duration,
    open_error: Option<String>,
    panic_on_open: bool,
    lines: Vec<(Duration, ScriptLine)>,
    next_delay: Duration,
}

impl StreamScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the request itself with `message`
    pub fn open_error(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    /// Panic inside the transport, killing the calling task
    pub fn panic_on_open(mut self) -> Self {
        self.panic_on_open = true;
        self
    }

    /// Delay before the response headers "arrive"
    pub fn open_after(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Delay before the next line
    pub fn pause(mut self, delay: Duration) -> Self {
        self.next_delay = delay;
        self
    }

    pub fn raw(mut self, line: &str) -> Self {
        let delay = std::mem::take(&mut self.next_delay);
        self.lines.push((delay, ScriptLine::Line(line.to_string())));
        self
    }

    pub fn delta(self, content: &str) -> Self {
        self.raw(&delta_line(content))
    }

    pub fn done(self) -> Self {
        self.raw("data: [DONE]")
    }

    /// Body read failure after the lines so far
    pub fn read_error(mut self, message: &str) -> Self {
        let delay = std::mem::take(&mut self.next_delay);
        self.lines
            .push((delay, ScriptLine::ReadError(message.to_string())));
        self
    }
}

/// In-process [`ChatTransport`] driven by per-model scripts
#[derive(Default)]
pub struct ScriptedTransport {
    batch: Mutex<HashMap<String, VecDeque<BatchReply>>>,
    streams: Mutex<HashMap<String, StreamScript>>,
    chat_calls: Mutex<HashMap<String, u32>>,
    stream_calls: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, model: &str, reply: BatchReply) -> Self {
        self.batch
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn answer(self, model: &str, content: &str) -> Self {
        self.answer_after(model, Duration::ZERO, content)
    }

    pub fn answer_after(self, model: &str, delay: Duration, content: &str) -> Self {
        self.reply(
            model,
            BatchReply::Answer {
                content: content.to_string(),
                reasoning: None,
                delay,
            },
        )
    }

    pub fn fail(self, model: &str) -> Self {
        self.reply(
            model,
            BatchReply::Fail {
                delay: Duration::ZERO,
            },
        )
    }

    pub fn stream(self, model: &str, script: StreamScript) -> Self {
        self.streams
            .lock()
            .unwrap()
            .insert(model.to_string(), script);
        self
    }

    pub fn chat_calls(&self, model: &str) -> u32 {
        self.chat_calls
            .lock()
            .unwrap()
            .get(model)
            .copied()
            .unwrap_or_default()
    }

    pub fn stream_calls(&self, model: &str) -> u32 {
        self.stream_calls
            .lock()
            .unwrap()
            .get(model)
            .copied()
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, counter: &Mutex<HashMap<String, u32>>, request: &ChatCompletionRequest) {
        *counter
            .lock()
            .unwrap()
            .entry(request.model.clone())
            .or_default() += 1;
        self.requests.lock().unwrap().push(request.clone());
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send_chat(
        &self,
        _endpoint: &ModelEndpoint,
        request: &ChatCompletionRequest,
    ) -> CouncilResult<ChatCompletionResponse> {
        self.record(&self.chat_calls, request);

        // Unscripted calls fail like an unreachable host
        let reply = self
            .batch
            .lock()
            .unwrap()
            .get_mut(&request.model)
            .and_then(VecDeque::pop_front)
            .unwrap_or(BatchReply::Fail {
                delay: Duration::ZERO,
            });

        match reply {
            BatchReply::Answer {
                content,
                reasoning,
                delay,
            } => {
                tokio::time::sleep(delay).await;
                let mut response = chat_response(&content);
                response.choices[0].message.reasoning_content = reasoning;
                Ok(response)
            }
            BatchReply::Fail { delay } => {
                tokio::time::sleep(delay).await;
                Err(CouncilError::request_failed(
                    format!("scripted failure for {}", request.model),
                    None,
                ))
            }
            BatchReply::Hang => {
                std::future::pending::<()>().await;
                unreachable!("pending future never resolves")
            }
        }
    }

    async fn open_chat_stream(
        &self,
        _endpoint: &ModelEndpoint,
        request: &ChatCompletionRequest,
    ) -> CouncilResult<LineStream> {
        self.record(&self.stream_calls, request);

        let script = self
            .streams
            .lock()
            .unwrap()
            .get(&request.model)
            .cloned()
            .unwrap_or_else(|| StreamScript::new().open_error("connection refused"));

        tokio::time::sleep(script.open_delay).await;
        if script.panic_on_open {
            panic!("scripted transport panic for {}", request.model);
        }
        if let Some(message) = script.open_error {
            return Err(CouncilError::request_failed(message, None));
        }

        let lines = futures_util::stream::iter(script.lines).then(|(delay, line)| async move {
            tokio::time::sleep(delay).await;
            match line {
                ScriptLine::Line(line) => Ok(line),
                ScriptLine::ReadError(message) => Err(CouncilError::request_failed(message, None)),
            }
        });

        Ok(lines.boxed())
    }
}

/// Drain a stream to completion
pub async fn collect_events<S>(stream: S) -> Vec<StreamEvent>
where
    S: futures_util::Stream<Item = StreamEvent>,
{
    stream.collect().await
}

pub fn deltas_for<'a>(events: &'a [StreamEvent], model: &str) -> Vec<&'a str> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Delta { model: m, content } if m == model => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

pub fn position_of(events: &[StreamEvent], wanted: &StreamEvent) -> usize {
    events
        .iter()
        .position(|event| event == wanted)
        .unwrap_or_else(|| panic!("event {wanted:?} not found in {events:?}"))
}
