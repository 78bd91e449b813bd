//! Scripted job backends for poller tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use providers::{JobBackend, JobPayload, JobStatusResponse, ProviderError, ProviderResult};
use serde_json::json;

/// Backend that replays a fixed sequence of poll responses.
/// Once the script runs out it keeps answering `processing`.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<ProviderResult<JobStatusResponse>>>,
    queries: AtomicU32,
}

impl ScriptedBackend {
    pub fn new(script: Vec<ProviderResult<JobStatusResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            queries: AtomicU32::new(0),
        }
    }

    /// `processing` forever
    pub fn stuck() -> Self {
        Self::new(Vec::new())
    }

    pub fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    async fn submit(&self, _payload: &JobPayload) -> ProviderResult<String> {
        Ok("job-42".to_string())
    }

    async fn query(&self, _job_id: &str) -> ProviderResult<JobStatusResponse> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(JobStatusResponse::processing()))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub fn payload() -> JobPayload {
    JobPayload {
        model_name: "tryon-v1.6".to_string(),
        inputs: json!({"num_samples": 1}),
    }
}

pub fn transport_error() -> ProviderError {
    ProviderError::transport("scripted", "connection reset by peer")
}
