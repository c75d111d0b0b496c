//! Parallel Batch Orchestrator: every model at once, joined into one map

use super::request::RequestExecutor;
use super::Target;
use crate::core_types::{Message, ModelId, QueryResult};
use crate::logging::log_info;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::time::Instant;

/// Query every target concurrently and wait for all of them
///
/// The map holds exactly one entry per target; failed models map to
/// `None`. Latency follows the slowest model, and no model's failure
/// affects another's result.
pub async fn query_parallel(
    executor: &RequestExecutor,
    targets: &[Target],
    messages: &[Message],
) -> HashMap<ModelId, Option<QueryResult>> {
    let start_time = Instant::now();

    let queries = targets
        .iter()
        .map(|(model, endpoint)| executor.execute(model, endpoint, messages));
    let responses = join_all(queries).await;

    let results: HashMap<ModelId, Option<QueryResult>> = targets
        .iter()
        .map(|(model, _)| model.clone())
        .zip(responses)
        .collect();

    log_info!(
        model_count = targets.len(),
        succeeded = results.values().filter(|r| r.is_some()).count(),
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Batch council query finished"
    );

    results
}
