//! In-process provider adapters that never touch the network

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use providers::{PreparedRequest, ProviderAdapter, ProviderError, ProviderResult};
use serde_json::json;
use shared::{GenerationMetadata, GenerationRequest, GenerationResult, OutputConfig, ProgressReporter};

use super::fixtures::solid_image;

/// Returns `count` solid images from a single call
#[derive(Default)]
pub struct MultiOutputAdapter {
    calls: AtomicUsize,
}

impl MultiOutputAdapter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MultiOutputAdapter {
    fn name(&self) -> &'static str {
        "fake-multi"
    }

    fn model(&self) -> String {
        "fake-multi-v1".to_string()
    }

    fn prepare(&self, request: &GenerationRequest) -> ProviderResult<PreparedRequest> {
        Ok(PreparedRequest {
            prompt: "fake".to_string(),
            negative_prompt: String::new(),
            parameters: json!({"count": request.count().get()}),
        })
    }

    async fn generate(&self, request: &GenerationRequest, progress: &ProgressReporter) -> ProviderResult<GenerationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress.report("Fake generating", 50);
        let images = (0..request.count().as_usize())
            .map(|i| solid_image([i as u8 * 40, 100, 200]))
            .collect();
        let mut metadata = GenerationMetadata::new(self.name(), self.model());
        metadata.seed = request.config.seed;
        Ok(GenerationResult::new(images, metadata))
    }

    async fn check_status(&self) -> bool {
        true
    }

    fn estimate_cost(&self, config: &OutputConfig) -> f64 {
        0.01 * config.count.get() as f64
    }

    fn supports_seed(&self) -> bool {
        true
    }

    fn supports_multi_output(&self) -> bool {
        true
    }
}

/// One image per call; calls whose 1-based ordinal is in `failing` error
pub struct SingleOutputAdapter {
    calls: AtomicUsize,
    failing: HashSet<usize>,
    counts_seen: Mutex<Vec<u8>>,
}

impl SingleOutputAdapter {
    pub fn new() -> Self {
        Self::failing_on(&[])
    }

    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: calls.iter().copied().collect(),
            counts_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Output count of every request this adapter received
    pub fn counts_seen(&self) -> Vec<u8> {
        self.counts_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for SingleOutputAdapter {
    fn name(&self) -> &'static str {
        "fake-single"
    }

    fn model(&self) -> String {
        "fake-single-v1".to_string()
    }

    fn prepare(&self, _request: &GenerationRequest) -> ProviderResult<PreparedRequest> {
        Ok(PreparedRequest {
            prompt: "fake".to_string(),
            negative_prompt: String::new(),
            parameters: json!({}),
        })
    }

    async fn generate(&self, request: &GenerationRequest, _progress: &ProgressReporter) -> ProviderResult<GenerationResult> {
        let ordinal = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.counts_seen.lock().unwrap().push(request.count().get());
        tokio::task::yield_now().await;

        if self.failing.contains(&ordinal) {
            return Err(ProviderError::backend(self.name(), format!("call {ordinal} rejected")));
        }
        Ok(GenerationResult::new(
            vec![solid_image([200, 200, 200])],
            GenerationMetadata::new(self.name(), self.model()),
        ))
    }

    async fn check_status(&self) -> bool {
        true
    }

    fn estimate_cost(&self, _config: &OutputConfig) -> f64 {
        0.04
    }

    fn supports_seed(&self) -> bool {
        false
    }
}
