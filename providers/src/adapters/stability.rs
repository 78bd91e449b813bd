//! Stable Diffusion 3.5 adapter: multipart image-to-image, one image per call

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::json;
use tokio::time::Instant;
use tracing::debug;

use shared::logging::{self, Component};
use shared::{GenerationRequest, GenerationResult, OutputConfig, ProgressReporter, PromptBuilder};
use crate::adapters::{base_metadata, settle_sequential, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::traits::{PreparedRequest, ProviderAdapter};

const PROVIDER: &str = "stability";
pub const DEFAULT_BASE_URL: &str = "https://api.stability.ai";
pub const DEFAULT_MODEL: &str = "sd3.5-large";

/// Reference image only hints at colors and patterns
const IMAGE_STRENGTH: f64 = 0.95;
const CFG_SCALE: f64 = 9.0;

/// Stability AI adapter
pub struct StabilityAdapter {
    api_key: String,
    base_url: String,
    model: String,
    prompts: Arc<dyn PromptBuilder>,
    client: reqwest::Client,
}

impl StabilityAdapter {
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

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn form(&self, prepared: &PreparedRequest, reference_png: Option<&[u8]>) -> ProviderResult<Form> {
        let params = &prepared.parameters;
        let text = |key: &str| params.get(key).map(value_text).unwrap_or_default();

        let mut form = Form::new()
            .text("prompt", prepared.prompt.clone())
            .text("negative_prompt", prepared.negative_prompt.clone())
            .text("model", text("model"))
            .text("mode", text("mode"))
            .text("cfg_scale", text("cfg_scale"))
            .text("seed", text("seed"))
            .text("output_format", "png");

        form = match reference_png {
            Some(bytes) => {
                let part = Part::bytes(bytes.to_vec())
                    .file_name("reference.png")
                    .mime_str("image/png")
                    .map_err(|e| ProviderError::configuration(format!("invalid multipart part: {e}")))?;
                form.part("image", part).text("strength", text("strength"))
            }
            None => form.text("aspect_ratio", text("aspect_ratio")),
        };

        Ok(form)
    }

    async fn generate_one(&self, prepared: &PreparedRequest, reference_png: Option<&[u8]>) -> ProviderResult<image::DynamicImage> {
        let response = self
            .client
            .post(format!("{}/v2beta/stable-image/generate/sd3", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Accept", "image/*")
            .multipart(self.form(prepared, reference_png)?)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, "generation request failed", e))?;
        let response = http::ensure_success(PROVIDER, response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| http::transport(PROVIDER, "response body interrupted", e))?;
        http::decode_image(PROVIDER, bytes.to_vec()).await
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ProviderAdapter for StabilityAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn prepare(&self, request: &GenerationRequest) -> ProviderResult<PreparedRequest> {
        let pair = self.prompts.build(&request.garments, &request.subject, &request.config);
        let mode = if request.garments.is_empty() { "text-to-image" } else { "image-to-image" };

        let parameters = json!({
            "model": self.model,
            "mode": mode,
            "strength": IMAGE_STRENGTH,
            "cfg_scale": CFG_SCALE,
            // 0 lets the backend pick a random seed
            "seed": request.config.seed.unwrap_or(0),
            "aspect_ratio": request.config.resolution.aspect_ratio(),
            "output_format": "png",
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

        // First garment is the reference image
        let reference_png = match request.garments.first() {
            Some(garment) => {
                progress.report("Encoding reference image", 25);
                Some(http::load_png(PROVIDER, &garment.image_path, http::MAX_INPUT_EDGE).await?)
            }
            None => None,
        };

        let mut images = Vec::with_capacity(count);
        let mut last_error = None;

        for i in 0..count {
            progress.report(
                &format!("Generating image {}/{}", i + 1, count),
                30 + (60 * i / count) as u8,
            );
            match self.generate_one(&prepared, reference_png.as_deref()).await {
                Ok(image) => images.push(image),
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

        let mode = prepared.parameters["mode"].clone();
        let metadata = base_metadata(PROVIDER, &self.model, request, true, images.len(), started)
            .with_diagnostic("mode", mode);

        Ok(GenerationResult::new(images, metadata))
    }

    async fn check_status(&self) -> bool {
        match self
            .client
            .get(format!("{}/v1/engines/list", self.base_url))
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
        let per_image = if self.model.contains("turbo") { 0.040 } else { 0.065 };
        per_image * config.count.get() as f64
    }

    fn supports_seed(&self) -> bool {
        true
    }
}
