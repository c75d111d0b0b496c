//! Core types shared by the executors and the fan-in multiplexer
//!
//! ## Organization
//! - `messages` - Conversation messages and per-model query results
//! - `events` - Stream events emitted by the streaming fan-out

pub mod events;
pub mod messages;

pub use events::StreamEvent;
pub use messages::{Message, MessageRole, ModelId, QueryResult};
