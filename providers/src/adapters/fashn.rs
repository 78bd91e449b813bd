//! Virtual try-on adapter: submit a job, poll until done, download outputs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;
use tracing::debug;

use shared::logging::Component;
use shared::{
    component_info, GarmentCategory, GenerationRequest, GenerationResult, OutputConfig, ProgressReporter, PromptBuilder,
};
use crate::adapters::{base_metadata, DEFAULT_REQUEST_TIMEOUT};
use crate::client::JobApiClient;
use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::job::JobPayload;
use crate::poller::AsyncPoller;
use crate::traits::{JobBackend, PreparedRequest, ProviderAdapter};

const PROVIDER: &str = "fashn";
pub const DEFAULT_BASE_URL: &str = "https://api.fashn.ai/v1";
pub const DEFAULT_MODEL: &str = "tryon-v1.6";
const COST_PER_SAMPLE: f64 = 0.075;

/// Dresses a reference person in the first garment of the request
pub struct FashnTryonAdapter {
    backend: Arc<dyn JobBackend>,
    downloader: reqwest::Client,
    poller: AsyncPoller,
    model: String,
    prompts: Arc<dyn PromptBuilder>,
}

impl FashnTryonAdapter {
    pub fn new(api_key: &str, prompts: Arc<dyn PromptBuilder>) -> ProviderResult<Self> {
        Self::with_base_url(api_key, prompts, DEFAULT_BASE_URL)
    }

    pub fn with_timeout(api_key: &str, prompts: Arc<dyn PromptBuilder>, timeout: Duration) -> ProviderResult<Self> {
        Self::connect(api_key, prompts, DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(api_key: &str, prompts: Arc<dyn PromptBuilder>, base_url: &str) -> ProviderResult<Self> {
        Self::connect(api_key, prompts, base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    fn connect(
        api_key: &str,
        prompts: Arc<dyn PromptBuilder>,
        base_url: &str,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let client = JobApiClient::new(PROVIDER, base_url, api_key, timeout)?;
        let downloader = client.http().clone();
        Ok(Self::with_backend(Arc::new(client), downloader, prompts))
    }

    pub fn with_backend(
        backend: Arc<dyn JobBackend>,
        downloader: reqwest::Client,
        prompts: Arc<dyn PromptBuilder>,
    ) -> Self {
        Self {
            backend,
            downloader,
            poller: AsyncPoller::default(),
            model: DEFAULT_MODEL.to_string(),
            prompts,
        }
    }

    pub fn with_poller(mut self, poller: AsyncPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn with_poll_timing(self, interval: Duration, timeout: Duration) -> Self {
        self.with_poller(AsyncPoller::new(interval, timeout))
    }

    fn wire_category(category: GarmentCategory) -> &'static str {
        match category {
            GarmentCategory::Top | GarmentCategory::Outer => "tops",
            GarmentCategory::Bottom => "bottoms",
            GarmentCategory::OnePiece => "one-pieces",
            GarmentCategory::Accessory => "auto",
        }
    }
}

#[async_trait]
impl ProviderAdapter for FashnTryonAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn prepare(&self, request: &GenerationRequest) -> ProviderResult<PreparedRequest> {
        let garment = request
            .garments
            .first()
            .ok_or_else(|| ProviderError::configuration("try-on requires at least one garment"))?;
        let person = request
            .subject
            .reference_person
            .as_ref()
            .ok_or_else(|| ProviderError::configuration("try-on requires a reference person image"))?;

        let pair = self.prompts.build(&request.garments, &request.subject, &request.config);

        let mut parameters = json!({
            "model_image": person.display().to_string(),
            "garment_image": garment.image_path.display().to_string(),
            "category": Self::wire_category(garment.category),
            "garment_photo_type": "flat-lay",
            "mode": "quality",
            "segmentation_free": true,
            "moderation_level": "permissive",
            "num_samples": request.count().get(),
            "output_format": "png",
        });
        if let Some(seed) = request.config.seed {
            parameters["seed"] = json!(seed);
        }

        Ok(PreparedRequest {
            prompt: pair.prompt,
            negative_prompt: pair.negative_prompt,
            parameters,
        })
    }

    async fn generate(&self, request: &GenerationRequest, progress: &ProgressReporter) -> ProviderResult<GenerationResult> {
        let started = Instant::now();
        let prepared = self.prepare(request)?;
        let mut inputs = prepared.parameters;

        progress.report("Encoding images", 10);
        // prepare() has already checked both are present
        if let (Some(person), Some(garment)) = (&request.subject.reference_person, request.garments.first()) {
            inputs["model_image"] = json!(http::load_data_url(PROVIDER, person, http::MAX_INPUT_EDGE).await?);
            inputs["garment_image"] =
                json!(http::load_data_url(PROVIDER, &garment.image_path, http::MAX_INPUT_EDGE).await?);
        }

        progress.report("Submitting try-on job", 20);
        let payload = JobPayload {
            model_name: self.model.clone(),
            inputs,
        };
        let completed = self.poller.run(self.backend.as_ref(), &payload, progress).await?;
        component_info!(
            Component::Provider(PROVIDER),
            "✅ Job {} completed after {} polls",
            completed.job.id,
            completed.polls
        );

        progress.report("Downloading images", 90);
        let mut images = Vec::with_capacity(completed.outputs.len());
        for url in &completed.outputs {
            images.push(http::download_image(&self.downloader, PROVIDER, url).await?);
        }
        debug!("{} downloaded {} images", PROVIDER, images.len());

        let mut metadata = base_metadata(PROVIDER, &self.model, request, true, images.len(), started)
            .with_diagnostic("polls", completed.polls)
            .with_diagnostic("job_elapsed_ms", completed.elapsed.as_millis() as u64);
        metadata.job_id = Some(completed.job.id);

        Ok(GenerationResult::new(images, metadata))
    }

    async fn check_status(&self) -> bool {
        self.backend.health_check().await
    }

    fn estimate_cost(&self, config: &OutputConfig) -> f64 {
        COST_PER_SAMPLE * config.count.get() as f64
    }

    fn supports_seed(&self) -> bool {
        true
    }

    fn supports_multi_output(&self) -> bool {
        true
    }
}
