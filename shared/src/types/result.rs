//! Result-side data model: generated images plus run metadata

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an orchestration call produced its images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One adapter call returning every output
    Native,
    /// One single-output adapter call per requested output
    FanOut,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Native => write!(f, "native"),
            Strategy::FanOut => write!(f, "fan_out"),
        }
    }
}

/// Outcome of one fan-out task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub index: usize,
    pub image_count: usize,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl TaskOutcome {
    pub fn succeeded(index: usize, image_count: usize, elapsed_ms: u64) -> Self {
        Self {
            index,
            image_count,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(index: usize, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            index,
            image_count: 0,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Metadata attached to every generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub provider: String,
    pub model: String,
    pub strategy: Strategy,
    pub requested_images: usize,
    pub total_images: usize,
    pub seed: Option<i64>,
    pub elapsed_ms: u64,
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<TaskOutcome>,
    /// Provider-specific extras (revised prompt, cost, poll count)
    #[serde(default)]
    pub diagnostics: serde_json::Map<String, serde_json::Value>,
}

impl GenerationMetadata {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            strategy: Strategy::Native,
            requested_images: 0,
            total_images: 0,
            seed: None,
            elapsed_ms: 0,
            job_id: None,
            outcomes: Vec::new(),
            diagnostics: serde_json::Map::new(),
        }
    }

    pub fn with_diagnostic(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.diagnostics.insert(key.to_string(), value.into());
        self
    }

    pub fn partial_failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Images plus metadata, produced once per orchestration call
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub images: Vec<DynamicImage>,
    pub metadata: GenerationMetadata,
}

impl GenerationResult {
    pub fn new(images: Vec<DynamicImage>, metadata: GenerationMetadata) -> Self {
        Self { images, metadata }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
