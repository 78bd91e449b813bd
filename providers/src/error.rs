//! Provider error types

use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures surfaced by adapters and the job poller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network failure or non-success HTTP status
    #[error("{provider} transport error: {message}")]
    Transport { provider: String, message: String },

    /// The backend answered but reported a failure
    #[error("{provider} backend error: {message}")]
    Backend { provider: String, message: String },

    #[error("{provider} job {job_id} timed out after {elapsed:?}")]
    Timeout {
        provider: String,
        job_id: String,
        elapsed: Duration,
    },

    /// Success reported without usable output
    #[error("{provider} returned unusable output: {message}")]
    DataIntegrity { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Job {job_id} cancelled")]
    Cancelled { job_id: String },

    /// Image decoding or encoding panicked or was aborted off the runtime
    #[error("{provider} image worker failed: {message}")]
    Worker { provider: String, message: String },
}

impl ProviderError {
    pub fn transport(provider: &str, message: impl Into<String>) -> Self {
        ProviderError::Transport {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn backend(provider: &str, message: impl Into<String>) -> Self {
        ProviderError::Backend {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn data_integrity(provider: &str, message: impl Into<String>) -> Self {
        ProviderError::DataIntegrity {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ProviderError::Configuration {
            message: message.into(),
        }
    }

    pub fn worker(provider: &str, error: &tokio::task::JoinError) -> Self {
        let message = if error.is_panic() {
            "task panicked".to_string()
        } else {
            error.to_string()
        };
        ProviderError::Worker {
            provider: provider.to_string(),
            message,
        }
    }

    /// Transport errors are retried by the poller
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transport { .. })
    }
}
