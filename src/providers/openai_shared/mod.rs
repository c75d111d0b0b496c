//! Shared OpenAI-compatible API structures and utilities
//!
//! - `types` - Request, response and streaming chunk structures
//! - `utils` - SSE line parsing, response extraction and the HTTP transport

pub mod types;
pub mod utils;

#[cfg(test)]
mod tests;

pub use types::*;
pub use utils::*;
