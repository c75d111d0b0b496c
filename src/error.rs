//! Error types for council operations.
//!
//! The main error type is [`CouncilError`]. Only configuration problems are
//! ever returned to callers of the fan-out operations; request failures are
//! absorbed by the executors and surface as `None` results (batch mode) or
//! as terminal [`StreamEvent::Error`](crate::StreamEvent::Error) events
//! (streaming mode).
//!
//! # Error Handling Example
//!
//! ```rust
//! use llm_council::{CouncilError, error::ErrorCategory};
//!
//! fn describe(err: &CouncilError) -> &'static str {
//!     match err.category() {
//!         ErrorCategory::Configuration => "fix llm_config.json",
//!         ErrorCategory::Transient => "the model will be retried",
//!         ErrorCategory::External => "the provider misbehaved",
//!     }
//! }
//! ```

use crate::logging::{log_error, log_warn};
use thiserror::Error;

/// High-level categorization of errors for routing and handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown model or invalid configuration. Fatal, never retried.
    Configuration,

    /// Network issues, timeouts, rate limits and non-2xx responses.
    Transient,

    /// The provider answered, but with something we could not use.
    External,
}

/// Convenient result type for council operations.
pub type CouncilResult<T> = std::result::Result<T, CouncilError>;

/// Errors that can occur while resolving or querying council models.
///
/// | Variant | Category | Retryable |
/// |---------|----------|-----------|
/// | `ModelNotFound` | Configuration | No |
/// | `ConfigurationError` | Configuration | No |
/// | `RequestFailed` | Transient | Yes |
/// | `Timeout` | Transient | Yes |
/// | `RateLimitExceeded` | Transient | Yes |
/// | `AuthenticationFailed` | External | Yes |
/// | `ResponseParsingError` | External | Yes |
///
/// Every request-level failure is retryable; only configuration errors
/// end the retry loop early.
#[derive(Error, Debug)]
pub enum CouncilError {
    /// The requested model has no entry in the configuration.
    #[error("Model '{model}' not found in config")]
    ModelNotFound {
        /// The model identifier that was requested.
        model: String,
    },

    /// Configuration is missing, unreadable or inconsistent.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// The HTTP request failed or returned a non-success status.
    #[error("Request failed: {message}")]
    RequestFailed {
        /// Description of the failure.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The request exceeded its per-call timeout.
    #[error("Request timed out after {timeout_seconds}s")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout_seconds: u64,
    },

    /// The provider throttled the request (HTTP 429).
    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimitExceeded {
        /// Wait time suggested by the provider.
        retry_after_seconds: u64,
    },

    /// The provider rejected the credential (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Details about the authentication failure.
        message: String,
    },

    /// The provider's response body could not be interpreted.
    #[error("Response parsing failed: {message}")]
    ResponseParsingError {
        /// Details about the parsing failure.
        message: String,
    },
}

impl CouncilError {
    /// Get the error category for routing and handling decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ModelNotFound { .. } | Self::ConfigurationError { .. } => {
                ErrorCategory::Configuration
            }
            Self::RequestFailed { .. }
            | Self::Timeout { .. }
            | Self::RateLimitExceeded { .. } => ErrorCategory::Transient,
            Self::AuthenticationFailed { .. } | Self::ResponseParsingError { .. } => {
                ErrorCategory::External
            }
        }
    }

    /// Whether a batch query should spend another attempt after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Configuration)
    }

    /// Convert to a message that is safe to show to end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::ModelNotFound { model } => format!("Model '{model}' is not configured"),
            Self::ConfigurationError { .. } => {
                "Council configuration issue. Please check llm_config.json".to_string()
            }
            Self::RequestFailed { .. } => {
                "Unable to communicate with the model. Please try again".to_string()
            }
            Self::Timeout { .. } => "The model took too long to answer".to_string(),
            Self::RateLimitExceeded {
                retry_after_seconds,
            } => {
                format!("Model is busy. Please wait {retry_after_seconds} seconds and try again")
            }
            Self::AuthenticationFailed { .. } => {
                "The model rejected its credentials".to_string()
            }
            Self::ResponseParsingError { .. } => {
                "Received an invalid response from the model".to_string()
            }
        }
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================

    pub fn model_not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        log_error!(
            error_type = "model_not_found",
            model = %model,
            "Requested model is not configured"
        );
        Self::ModelNotFound { model }
    }

    pub fn configuration_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration_error",
            message = %message,
            "Council configuration invalid"
        );
        Self::ConfigurationError { message }
    }

    pub fn request_failed(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "request_failed",
            message = %message,
            has_source = source.is_some(),
            "Model request failed"
        );
        Self::RequestFailed { message, source }
    }

    pub fn timeout(timeout_seconds: u64) -> Self {
        log_warn!(
            error_type = "timeout",
            timeout_seconds = timeout_seconds,
            "Model request timed out"
        );
        Self::Timeout { timeout_seconds }
    }

    pub fn rate_limit_exceeded(retry_after_seconds: u64) -> Self {
        log_warn!(
            error_type = "rate_limit_exceeded",
            retry_after_seconds = retry_after_seconds,
            "Model provider rate limit exceeded"
        );
        Self::RateLimitExceeded {
            retry_after_seconds,
        }
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "authentication_failed",
            message = %message,
            "Model provider authentication failed"
        );
        Self::AuthenticationFailed { message }
    }

    pub fn response_parsing_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "response_parsing_error",
            message = %message,
            "Model response format invalid"
        );
        Self::ResponseParsingError { message }
    }
}
