//! Model backends
//!
//! Every council member speaks the OpenAI-compatible chat completions API,
//! so there is one wire format (`openai_shared`) and one seam through which
//! requests leave the process (`transport`).
//!
//! ```text
//! orchestrator ──> ChatTransport (transport.rs)
//!                        │
//!                        └── HttpTransport (openai_shared/utils.rs, reqwest)
//! ```

pub mod openai_shared;
pub mod transport;

pub use openai_shared::http::HttpTransport;
pub use transport::{ChatTransport, LineStream};
