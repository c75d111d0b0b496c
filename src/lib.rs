//! # llm-council
//!
//! Concurrent query orchestrator for a council of OpenAI-compatible chat
//! completion backends. One prompt goes out to several models at once and
//! their answers come back either as a joined map or as one merged stream of
//! token deltas.
//!
//! ## Key Features
//!
//! - **Batch fan-out**: every model queried concurrently with bounded retry;
//!   failed models map to `None` instead of failing the call
//! - **Streaming fan-in**: deltas from all models merged in arrival order,
//!   with a `ModelComplete` per model and a single terminal `AllDone`
//! - **Failure isolation**: a slow or failing model never delays or breaks
//!   its siblings
//! - **Explicit configuration**: no global state; reloading returns a new
//!   client
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use llm_council::{CouncilClient, CouncilConfig, Message, ModelEndpoint, StreamEvent};
//!
//! # async fn example() -> llm_council::CouncilResult<()> {
//! let config = CouncilConfig::new()
//!     .with_model("gpt-5.1", ModelEndpoint::new("https://api.openai.com/v1/chat/completions", "sk-..."))
//!     .with_model("grok-4", ModelEndpoint::new("https://api.x.ai/v1/chat/completions", "xai-..."))
//!     .with_council(["gpt-5.1", "grok-4"]);
//!
//! let client = CouncilClient::new(config)?;
//! let messages = vec![Message::user("What is the airspeed of an unladen swallow?")];
//!
//! let answers = client.query_council(&messages).await?;
//! for (model, answer) in &answers {
//!     println!("{model}: {:?}", answer.as_ref().map(|a| a.text()));
//! }
//!
//! let mut stream = client.stream_council(&messages)?;
//! while let Some(event) = stream.next().await {
//!     if let StreamEvent::Delta { model, content } = event {
//!         print!("[{model}] {content}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Errors are self-documenting via CouncilError variants
#![allow(clippy::missing_errors_doc)]

pub(crate) mod logging;

pub mod client;
pub mod config;
pub mod core_types;
pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod retry;

#[cfg(test)]
pub mod tests;

pub use client::CouncilClient;
pub use config::{CouncilConfig, ModelEndpoint};
pub use core_types::{Message, MessageRole, ModelId, QueryResult, StreamEvent};
pub use error::{CouncilError, CouncilResult};
pub use orchestrator::CouncilStream;
pub use providers::{ChatTransport, HttpTransport, LineStream};
pub use retry::{BackoffStrategy, RetryPolicy};
