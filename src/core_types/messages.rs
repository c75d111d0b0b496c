//! Conversation messages and query results
//!
//! A conversation is an ordered, immutable slice of [`Message`]s. The
//! orchestrator shares one conversation across every model it queries, so
//! callers hand it over once and it is wrapped in an `Arc<[Message]>`.

use serde::{Deserialize, Serialize};

/// Opaque name of a configured model backend.
pub type ModelId = String;

/// Message roles understood by OpenAI-compatible chat completion APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Answer from a single model in batch mode.
///
/// Both fields are optional because reasoning models may return only
/// `reasoning_content`, and some gateways send `content: null` on refusals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
}

impl QueryResult {
    /// The answer text, or an empty string when the model sent none.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}
