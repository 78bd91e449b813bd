//! DALL-E 3 adapter: synchronous, one image per call, no seed

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::debug;

use shared::logging::{self, Component};
use shared::{
    GenerationRequest, GenerationResult, OutputConfig, ProgressReporter, PromptBuilder, QualityTier,
    Resolution,
};
use crate::adapters::{base_metadata, settle_sequential, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::traits::{PreparedRequest, ProviderAdapter};

const PROVIDER: &str = "openai";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "dall-e-3";

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

/// OpenAI image generation adapter
pub struct OpenAiAdapter {
    api_key: String,
    base_url: String,
    model: String,
    prompts: Arc<dyn PromptBuilder>,
    client: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(api_key: &str, prompts: Arc<dyn PromptBuilder>) -> ProviderResult<Self> {
        Self::with_timeout(api_key, prompts, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_key: &str, prompts: Arc<dyn PromptBuilder>, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompts,
            client: http::build_client(timeout)?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = http::normalize_base(base_url);
        self
    }

    /// DALL-E 3 has no 512px size
    fn wire_size(resolution: Resolution) -> &'static str {
        match resolution {
            Resolution::Square512 => Resolution::Square1024.as_str(),
            other => other.as_str(),
        }
    }

    async fn generate_one(&self, prepared: &PreparedRequest) -> ProviderResult<(image::DynamicImage, Option<String>)> {
        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&prepared.parameters)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, "image request failed", e))?;
        let response = http::ensure_success(PROVIDER, response).await?;

        let body: ImagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::data_integrity(PROVIDER, format!("unreadable response: {e}")))?;

        let datum = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::data_integrity(PROVIDER, "response contained no images"))?;

        let image = match (datum.b64_json, datum.url) {
            (Some(encoded), _) => http::decode_base64(PROVIDER, encoded).await?,
            (None, Some(url)) => http::download_image(&self.client, PROVIDER, &url).await?,
            (None, None) => {
                return Err(ProviderError::data_integrity(PROVIDER, "image entry had neither url nor data"))
            }
        };

        Ok((image, datum.revised_prompt))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn prepare(&self, request: &GenerationRequest) -> ProviderResult<PreparedRequest> {
        let pair = self.prompts.build(&request.garments, &request.subject, &request.config);
        let parameters = json!({
            "model": self.model,
            "prompt": pair.prompt,
            "size": Self::wire_size(request.config.resolution),
            "quality": request.config.quality.as_str(),
            "n": 1,
            "response_format": "b64_json",
        });

        Ok(PreparedRequest {
            prompt: pair.prompt,
            negative_prompt: pair.negative_prompt,
            parameters,
        })
    }

    async fn generate(&self, request: &GenerationRequest, progress: &ProgressReporter) -> ProviderResult<GenerationResult> {
        let started = Instant::now();
        let prepared = self.prepare(request)?;
        let count = request.count().as_usize();

        let mut images = Vec::with_capacity(count);
        let mut revised_prompts = Vec::new();
        let mut last_error = None;

        for i in 0..count {
            progress.report(
                &format!("Generating image {}/{}", i + 1, count),
                30 + (60 * i / count) as u8,
            );
            match self.generate_one(&prepared).await {
                Ok((image, revised)) => {
                    images.push(image);
                    revised_prompts.extend(revised);
                }
                Err(e) => {
                    logging::log_partial_failure(
                        &Component::Provider(PROVIDER),
                        &format!("Image {}/{}", i + 1, count),
                        &e,
                    );
                    last_error = Some(e);
                }
            }
        }

        let images = settle_sequential(images, last_error, PROVIDER)?;
        debug!("{} produced {} of {} images", PROVIDER, images.len(), count);

        let mut metadata = base_metadata(PROVIDER, &self.model, request, false, images.len(), started)
            .with_diagnostic("size", Self::wire_size(request.config.resolution))
            .with_diagnostic("quality", request.config.quality.as_str());
        if !revised_prompts.is_empty() {
            metadata = metadata.with_diagnostic("revised_prompts", revised_prompts);
        }

        Ok(GenerationResult::new(images, metadata))
    }

    async fn check_status(&self) -> bool {
        match self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("{} status check failed: {}", PROVIDER, e);
                false
            }
        }
    }

    fn estimate_cost(&self, config: &OutputConfig) -> f64 {
        let per_image = match (config.resolution.is_square(), config.quality) {
            (true, QualityTier::Standard) => 0.040,
            (true, QualityTier::Hd) => 0.080,
            (false, QualityTier::Standard) => 0.080,
            (false, QualityTier::Hd) => 0.120,
        };
        per_image * config.count.get() as f64
    }

    fn supports_seed(&self) -> bool {
        false
    }
}
