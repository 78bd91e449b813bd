//! Concrete provider adapters

pub mod fashn;
pub mod imagen;
pub mod openai;
pub mod stability;

#[cfg(test)]
mod tests;

pub use fashn::FashnTryonAdapter;
pub use imagen::ImagenAdapter;
pub use openai::OpenAiAdapter;
pub use stability::StabilityAdapter;

use std::time::Duration;
use tokio::time::Instant;

use shared::{GenerationMetadata, GenerationRequest, Strategy};
use crate::error::ProviderError;

/// Default per-request HTTP timeout for synchronous backends
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Metadata common to every adapter result
pub(crate) fn base_metadata(
    provider: &str,
    model: &str,
    request: &GenerationRequest,
    seed_supported: bool,
    image_count: usize,
    started: Instant,
) -> GenerationMetadata {
    let mut metadata = GenerationMetadata::new(provider, model);
    metadata.strategy = Strategy::Native;
    metadata.requested_images = request.count().as_usize();
    metadata.total_images = image_count;
    metadata.seed = if seed_supported { request.config.seed } else { None };
    metadata.elapsed_ms = started.elapsed().as_millis() as u64;
    metadata
}

/// Outcome of a sequential single-image loop: keep what succeeded, and
/// fail only when nothing did
pub(crate) fn settle_sequential<T>(
    successes: Vec<T>,
    last_error: Option<ProviderError>,
    provider: &str,
) -> Result<Vec<T>, ProviderError> {
    if !successes.is_empty() {
        return Ok(successes);
    }
    Err(last_error.unwrap_or_else(|| ProviderError::data_integrity(provider, "no images produced")))
}
