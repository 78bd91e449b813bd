//! Provider trait definitions for dependency injection

use async_trait::async_trait;

use shared::{GenerationRequest, GenerationResult, OutputConfig, ProgressReporter};
use crate::error::ProviderResult;
use crate::job::{JobPayload, JobStatusResponse};

/// Provider-specific request parameters, built without side effects
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub parameters: serde_json::Value,
}

/// One image-synthesis backend behind a uniform contract
#[mockall::automock]
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short provider name used in logs and metadata
    fn name(&self) -> &'static str;

    /// Model identifier sent to the backend
    fn model(&self) -> String;

    /// Build the request body for this backend
    fn prepare(&self, request: &GenerationRequest) -> ProviderResult<PreparedRequest>;

    /// Produce images for the request
    async fn generate(&self, request: &GenerationRequest, progress: &ProgressReporter) -> ProviderResult<GenerationResult>;

    /// Liveness probe, independent of any job
    async fn check_status(&self) -> bool;

    /// Advisory cost in USD
    fn estimate_cost(&self, config: &OutputConfig) -> f64;

    fn supports_seed(&self) -> bool;

    fn supports_multi_output(&self) -> bool {
        false
    }
}

/// Submit/status API of a job-based backend
#[mockall::automock]
#[async_trait]
pub trait JobBackend: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Create a job, returning its identifier
    async fn submit(&self, payload: &JobPayload) -> ProviderResult<String>;

    /// Fetch the current status of a job
    async fn query(&self, job_id: &str) -> ProviderResult<JobStatusResponse>;

    /// Whether the backend is reachable with the configured credentials
    async fn health_check(&self) -> bool;
}
