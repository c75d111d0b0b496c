use crate::config::CouncilConfig;
use crate::core_types::{Message, ModelId, QueryResult, StreamEvent};
use crate::error::CouncilResult;
use crate::logging::log_debug;
use crate::orchestrator::{
    query_parallel, resolve_targets, CouncilStream, RequestExecutor, StreamExecutor,
};
use crate::providers::{ChatTransport, HttpTransport};
use crate::retry::RetryPolicy;
use futures_util::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Arc;

/// Entry point for querying council models
///
/// Holds an immutable [`CouncilConfig`], the transport requests go through,
/// and the retry policy. Cloning is cheap; clones share the transport's
/// connection pool.
#[derive(Clone)]
pub struct CouncilClient {
    config: Arc<CouncilConfig>,
    transport: Arc<dyn ChatTransport>,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for CouncilClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouncilClient")
            .field("config", &self.config)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl CouncilClient {
    /// Client over HTTP with the default retry policy
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::ConfigurationError`](crate::CouncilError::ConfigurationError)
    /// if the configuration fails validation.
    pub fn new(config: CouncilConfig) -> CouncilResult<Self> {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// Client over a caller-provided transport
    pub fn with_transport(
        config: CouncilConfig,
        transport: Arc<dyn ChatTransport>,
    ) -> CouncilResult<Self> {
        config.validate()?;

        log_debug!(
            model_count = config.models.len(),
            council = ?config.council,
            "CouncilClient created"
        );

        Ok(Self {
            config: Arc::new(config),
            transport,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Client configured from `llm_config.json` (see [`CouncilConfig::load`])
    pub fn from_default_config() -> CouncilResult<Self> {
        Self::new(CouncilConfig::load()?)
    }

    /// Replace the retry policy; its `request_timeout` also bounds streams
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn config(&self) -> &CouncilConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// A new client over a freshly re-read configuration
    ///
    /// `self` keeps its configuration, so queries already running are not
    /// affected.
    pub fn reload_config(&self) -> CouncilResult<Self> {
        let config = self.config.reload()?;
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            transport: Arc::clone(&self.transport),
            retry_policy: self.retry_policy.clone(),
        })
    }

    fn request_executor(&self) -> RequestExecutor {
        RequestExecutor::new(Arc::clone(&self.transport), self.retry_policy.clone())
    }

    fn stream_executor(&self) -> StreamExecutor {
        StreamExecutor::new(
            Arc::clone(&self.transport),
            self.retry_policy.request_timeout,
        )
    }

    /// Query one model, retrying per the policy
    ///
    /// `Ok(None)` means every attempt failed.
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::ModelNotFound`](crate::CouncilError::ModelNotFound)
    /// if the model is not configured.
    pub async fn query_model(
        &self,
        model: &str,
        messages: &[Message],
    ) -> CouncilResult<Option<QueryResult>> {
        let endpoint = self.config.model_endpoint(model)?;
        Ok(self.request_executor().execute(model, endpoint, messages).await)
    }

    /// Query every model concurrently
    ///
    /// The map has one entry per distinct requested model; models whose
    /// attempts all failed map to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::ModelNotFound`](crate::CouncilError::ModelNotFound)
    /// before sending anything if any model is not configured.
    pub async fn query_batch<S: AsRef<str>>(
        &self,
        models: &[S],
        messages: &[Message],
    ) -> CouncilResult<HashMap<ModelId, Option<QueryResult>>> {
        let targets = resolve_targets(&self.config, models)?;
        Ok(query_parallel(&self.request_executor(), &targets, messages).await)
    }

    /// [`query_batch`](Self::query_batch) over the configured council
    pub async fn query_council(
        &self,
        messages: &[Message],
    ) -> CouncilResult<HashMap<ModelId, Option<QueryResult>>> {
        self.query_batch(self.config.council_models(), messages).await
    }

    /// Stream one model's answer; the request is sent on first poll
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::ModelNotFound`](crate::CouncilError::ModelNotFound)
    /// if the model is not configured.
    pub fn query_model_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> CouncilResult<BoxStream<'static, StreamEvent>> {
        let endpoint = self.config.model_endpoint(model)?.clone();
        Ok(self.stream_executor().execute(model, endpoint, messages))
    }

    /// Stream every model's answer, merged in arrival order
    ///
    /// Ends with exactly one [`StreamEvent::AllDone`].
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::ModelNotFound`](crate::CouncilError::ModelNotFound)
    /// before anything starts if any model is not configured.
    pub fn query_stream<S: AsRef<str>>(
        &self,
        models: &[S],
        messages: &[Message],
    ) -> CouncilResult<CouncilStream> {
        let targets = resolve_targets(&self.config, models)?;
        Ok(CouncilStream::new(
            self.stream_executor(),
            targets,
            Arc::from(messages),
        ))
    }

    /// [`query_stream`](Self::query_stream) over the configured council
    pub fn stream_council(&self, messages: &[Message]) -> CouncilResult<CouncilStream> {
        self.query_stream(self.config.council_models(), messages)
    }
}
