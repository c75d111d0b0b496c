//! Tests for OpenAI-Shared Utilities
//!
//! Unit tests for the wire types, SSE parsing and line decoding used by
//! both executors.
