//! Imagen 4 adapter: synchronous, native multi-output

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::debug;

use shared::{GenerationRequest, GenerationResult, OutputConfig, ProgressReporter, PromptBuilder};
use crate::adapters::{base_metadata, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::traits::{PreparedRequest, ProviderAdapter};

const PROVIDER: &str = "imagen";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "imagen-4.0-generate-001";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

/// Google Imagen adapter
pub struct ImagenAdapter {
    api_key: String,
    base_url: String,
    model: String,
    prompts: Arc<dyn PromptBuilder>,
    client: reqwest::Client,
}

impl ImagenAdapter {
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

    fn predict_url(&self) -> String {
        format!("{}/v1beta/models/{}:predict", self.base_url, self.model)
    }
}

#[async_trait]
impl ProviderAdapter for ImagenAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn prepare(&self, request: &GenerationRequest) -> ProviderResult<PreparedRequest> {
        let pair = self.prompts.build(&request.garments, &request.subject, &request.config);

        let mut parameters = json!({
            "sampleCount": request.count().get(),
            "aspectRatio": request.config.resolution.aspect_ratio(),
            "personGeneration": "allow_adult",
            "safetyFilterLevel": "block_few",
        });
        // A fixed seed requires the watermark to be off
        if let Some(seed) = request.config.seed {
            parameters["seed"] = json!(seed);
            parameters["addWatermark"] = json!(false);
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
        let body = json!({
            "instances": [{ "prompt": prepared.prompt }],
            "parameters": prepared.parameters,
        });

        progress.report("Requesting images", 30);
        let response = self
            .client
            .post(self.predict_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, "predict request failed", e))?;
        let response = http::ensure_success(PROVIDER, response).await?;

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::data_integrity(PROVIDER, format!("unreadable response: {e}")))?;

        progress.report("Decoding images", 85);
        let encoded: Vec<String> = parsed
            .predictions
            .into_iter()
            .filter_map(|p| p.bytes_base64_encoded)
            .collect();
        let images = http::off_runtime(PROVIDER, move || {
            encoded
                .iter()
                .map(|data| http::decode_base64_image(PROVIDER, data))
                .collect::<ProviderResult<Vec<_>>>()
        })
        .await?;

        if images.is_empty() {
            // Safety filtering drops predictions silently
            return Err(ProviderError::data_integrity(PROVIDER, "no predictions returned"));
        }
        debug!("{} returned {} images", PROVIDER, images.len());

        let metadata = base_metadata(PROVIDER, &self.model, request, true, images.len(), started)
            .with_diagnostic("aspect_ratio", request.config.resolution.aspect_ratio());

        Ok(GenerationResult::new(images, metadata))
    }

    async fn check_status(&self) -> bool {
        match self
            .client
            .get(format!("{}/v1beta/models/{}", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
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
        let per_image = if self.model.contains("fast") {
            0.02
        } else if self.model.contains("ultra") {
            0.08
        } else {
            0.04
        };
        per_image * config.count.get() as f64
    }

    fn supports_seed(&self) -> bool {
        true
    }

    fn supports_multi_output(&self) -> bool {
        true
    }
}
