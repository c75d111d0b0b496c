//! Logging utilities for llm-council
//!
//! Re-exports tracing macros with log_* naming so call sites read the same
//! across the orchestrator, transport and config layers.

pub(crate) use tracing::{
    debug as log_debug,
    error as log_error,
    info as log_info,
    warn as log_warn,
};
