//! OpenAI-compatible data structures and types
//!
//! Contains the chat completion request, response and streaming chunk
//! structures spoken by every council backend.

use crate::core_types::{Message, ModelId};
use serde::{Deserialize, Serialize};

/// Reasoning effort hint sent with every council request
pub const REASONING_EFFORT: &str = "high";

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: ModelId,
    pub messages: Vec<Message>,
    pub reasoning_effort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatCompletionRequest {
    /// Non-streaming request for `model` over the given conversation
    pub fn new(model: impl Into<ModelId>, messages: &[Message]) -> Self {
        Self {
            model: model.into(),
            messages: messages.to_vec(),
            reasoning_effort: REASONING_EFFORT.to_string(),
            stream: None,
        }
    }

    /// Same request with `stream: true`
    pub fn streaming(mut self) -> Self {
        self.stream = Some(true);
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// Choice in a chat completion response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

/// Message in a chat completion choice
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

/// One `data:` payload of a streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}
