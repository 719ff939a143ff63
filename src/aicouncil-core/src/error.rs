//! Error types for the council.

use std::time::Duration;

use thiserror::Error;

use crate::strategy::InvocationResult;

/// Errors that end a whole run (or reject it before any backend is called).
#[derive(Error, Debug)]
pub enum CouncilError {
    #[error("No AI backends are configured. Please check your API keys.")]
    NoBackendsConfigured,

    #[error("Invalid mode '{0}': expected 'compare' or 'debate'")]
    InvalidMode(String),

    #[error("Transcript contains no user message")]
    EmptyTranscript,

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Run cancelled after {} backend(s) completed", .completed.len())]
    Cancelled { completed: Vec<InvocationResult> },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Failure of a single backend invocation.
///
/// These never abort a run; they are recorded in that backend's
/// [`InvocationResult`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled")]
    Cancelled,

    #[error("Invocation task failed: {0}")]
    TaskFailed(String),
}

impl ProviderError {
    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::Auth(_) => "auth",
            ProviderError::RateLimited(_) => "rate_limit",
            ProviderError::MalformedResponse(_) => "malformed_response",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Cancelled => "cancelled",
            ProviderError::TaskFailed(_) => "task_failed",
        }
    }

    /// Classify an HTTP status code with its body/message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = format!("HTTP {} - {}", status, message.into());
        match status {
            401 | 403 => ProviderError::Auth(message),
            429 => ProviderError::RateLimited(message),
            _ => ProviderError::Network(message),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ProviderError::from_status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return ProviderError::MalformedResponse(err.to_string());
        }
        ProviderError::Network(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for ProviderError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;

        match err {
            OpenAIError::Reqwest(e) => e.into(),
            OpenAIError::ApiError(api) => classify_api_message(&api.message),
            e @ OpenAIError::JSONDeserialize(..) => ProviderError::MalformedResponse(e.to_string()),
            e @ OpenAIError::InvalidArgument(_) => ProviderError::MalformedResponse(e.to_string()),
            other => ProviderError::Network(other.to_string()),
        }
    }
}

/// OpenAI-compatible APIs report auth and quota problems only in the
/// error body, so the message text is all there is to go on.
fn classify_api_message(message: &str) -> ProviderError {
    let lower = message.to_lowercase();
    if ["api key", "unauthorized", "authentication"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        ProviderError::Auth(message.to_string())
    } else if ["rate limit", "quota", "too many requests"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        ProviderError::RateLimited(message.to_string())
    } else {
        ProviderError::Network(message.to_string())
    }
}
