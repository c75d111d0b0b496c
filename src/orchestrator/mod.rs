//! Fan-out orchestration across council models
//!
//! - `request` - one model, non-streaming, bounded retry
//! - `stream` - one model, streaming, no retry
//! - `batch` - all models, non-streaming, joined into one map
//! - `fan_in` - all models, streaming, merged into one event stream

pub mod batch;
pub mod fan_in;
pub mod request;
pub mod stream;

pub use batch::query_parallel;
pub use fan_in::CouncilStream;
pub use request::RequestExecutor;
pub use stream::StreamExecutor;

use crate::config::{CouncilConfig, ModelEndpoint};
use crate::core_types::ModelId;
use crate::error::CouncilResult;
use std::collections::HashSet;

/// A model paired with the endpoint it resolves to
pub type Target = (ModelId, ModelEndpoint);

/// Resolve every requested model before any request is sent
///
/// Duplicates are dropped, keeping the first occurrence.
///
/// # Errors
///
/// Returns [`CouncilError::ModelNotFound`](crate::CouncilError::ModelNotFound)
/// for the first unconfigured model.
pub fn resolve_targets<S: AsRef<str>>(
    config: &CouncilConfig,
    models: &[S],
) -> CouncilResult<Vec<Target>> {
    let mut seen = HashSet::with_capacity(models.len());
    let mut targets = Vec::with_capacity(models.len());

    for model in models {
        let model = model.as_ref();
        if !seen.insert(model) {
            continue;
        }
        let endpoint = config.model_endpoint(model)?;
        targets.push((model.to_string(), endpoint.clone()));
    }

    Ok(targets)
}
