//! Events produced by the streaming fan-out
//!
//! Serialized with an internal `type` tag so a web layer can forward them
//! to browsers unchanged:
//!
//! ```json
//! {"type":"delta","model":"gpt-5.1","content":"Hel"}
//! {"type":"model_complete","model":"gpt-5.1","accumulated":"Hello"}
//! {"type":"all_done"}
//! ```

use serde::{Deserialize, Serialize};

use super::messages::ModelId;

/// One element of a merged council stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A non-empty content fragment from one model.
    Delta { model: ModelId, content: String },
    /// The model finished its answer.
    Done { model: ModelId },
    /// The model's stream failed; no further deltas follow for it.
    Error { model: ModelId, message: String },
    /// Synthesized after `Done` or `Error` with everything the model sent.
    ModelComplete { model: ModelId, accumulated: String },
    /// Every requested model has completed and all producers are joined.
    AllDone,
}

impl StreamEvent {
    /// The originating model. `None` only for [`StreamEvent::AllDone`].
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Delta { model, .. }
            | Self::Done { model }
            | Self::Error { model, .. }
            | Self::ModelComplete { model, .. } => Some(model),
            Self::AllDone => None,
        }
    }

    /// `Done` or `Error`: the last event a single-model stream produces.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Render as one Server-Sent-Events frame (`data: <json>\n\n`).
    pub fn to_sse_frame(&self) -> String {
        let payload = serde_json::to_string(self).unwrap_or_default();
        format!("data: {payload}\n\n")
    }
}
