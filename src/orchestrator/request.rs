//! Request Executor: one model, one answer, bounded retry

use crate::config::ModelEndpoint;
use crate::core_types::{Message, QueryResult};
use crate::error::CouncilResult;
use crate::logging::log_debug;
use crate::providers::openai_shared::{extract_query_result, ChatCompletionRequest};
use crate::providers::ChatTransport;
use crate::retry::{RetryExecutor, RetryPolicy};
use std::sync::Arc;
use std::time::Instant;

/// Executes non-streaming chat completions under a [`RetryPolicy`]
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn ChatTransport>,
    retry: RetryExecutor,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn ChatTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            retry: RetryExecutor::new(policy),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Query `model` at `endpoint` with the given conversation
    ///
    /// Returns `None` once every attempt has failed. Request errors are
    /// logged, never returned.
    pub async fn execute(
        &self,
        model: &str,
        endpoint: &ModelEndpoint,
        messages: &[Message],
    ) -> Option<QueryResult> {
        let start_time = Instant::now();
        let request = ChatCompletionRequest::new(model, messages);
        let request = &request;

        let outcome = self
            .retry
            .execute(model, move || self.attempt(endpoint, request))
            .await;

        log_debug!(
            model = %model,
            succeeded = outcome.is_ok(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Model query finished"
        );

        outcome.ok()
    }

    async fn attempt(
        &self,
        endpoint: &ModelEndpoint,
        request: &ChatCompletionRequest,
    ) -> CouncilResult<QueryResult> {
        let response = self.transport.send_chat(endpoint, request).await?;
        extract_query_result(response)
    }
}
