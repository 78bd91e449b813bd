//! HTTP client for backends exposing the uniform run/status job API

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::job::{JobPayload, JobStatusResponse};
use crate::traits::JobBackend;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// `POST {base}/run` and `GET {base}/status/{id}` with bearer auth
#[derive(Debug, Clone)]
pub struct JobApiClient {
    provider: &'static str,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl JobApiClient {
    pub fn new(provider: &'static str, base_url: &str, api_key: &str, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            provider,
            base_url: http::normalize_base(base_url),
            api_key: api_key.to_string(),
            client: http::build_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl JobBackend for JobApiClient {
    fn provider(&self) -> &'static str {
        self.provider
    }

    async fn submit(&self, payload: &JobPayload) -> ProviderResult<String> {
        let response = self
            .client
            .post(format!("{}/run", self.base_url))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| http::transport(self.provider, "submit failed", e))?;
        let response = http::ensure_success(self.provider, response).await?;

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::data_integrity(self.provider, format!("unreadable submit response: {e}")))?;

        // An error can arrive in-band with HTTP 200
        if let Some(error) = body.error.filter(|e| !e.is_null()) {
            let message = error
                .as_str()
                .map(str::to_string)
                .or_else(|| error.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| error.to_string());
            return Err(ProviderError::backend(self.provider, message));
        }

        body.id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::data_integrity(self.provider, "submit response carried no job id"))
    }

    async fn query(&self, job_id: &str) -> ProviderResult<JobStatusResponse> {
        let response = self
            .client
            .get(format!("{}/status/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| http::transport(self.provider, "status request failed", e))?;
        let response = http::ensure_success(self.provider, response).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::transport(self.provider, format!("unreadable status response: {e}")))
    }

    async fn health_check(&self) -> bool {
        // Any answer other than an auth rejection means the key is usable
        match self.client.get(&self.base_url).bearer_auth(&self.api_key).send().await {
            Ok(response) => !matches!(response.status().as_u16(), 401 | 403),
            Err(e) => {
                debug!("{} health check failed: {}", self.provider, e);
                false
            }
        }
    }
}
