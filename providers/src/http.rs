//! HTTP and image helpers shared by the adapters

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat};

use crate::error::{ProviderError, ProviderResult};

/// Longest edge sent to a backend as an input image
pub const MAX_INPUT_EDGE: u32 = 1024;

/// Build a client with a request timeout
pub fn build_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::configuration(format!("failed to build HTTP client: {e}")))
}

/// Strip trailing slashes from a base URL
pub fn normalize_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

pub fn transport(provider: &str, context: &str, error: reqwest::Error) -> ProviderError {
    ProviderError::transport(provider, format!("{context}: {error}"))
}

/// Turn a non-success status into a transport error carrying the body
pub async fn ensure_success(provider: &str, response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::transport(
        provider,
        format!("HTTP {}: {}", status.as_u16(), body.trim()),
    ))
}

/// Load an image from disk, scaling it down so neither edge exceeds `max_edge`
pub fn load_image(provider: &str, path: &Path, max_edge: u32) -> ProviderResult<DynamicImage> {
    let image = image::open(path).map_err(|e| {
        ProviderError::configuration(format!("{provider}: cannot read {}: {e}", path.display()))
    })?;

    if image.width().max(image.height()) > max_edge {
        Ok(image.resize(max_edge, max_edge, FilterType::Lanczos3))
    } else {
        Ok(image)
    }
}

pub fn encode_png(image: &DynamicImage) -> ProviderResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ProviderError::configuration(format!("failed to encode PNG: {e}")))?;
    Ok(buffer.into_inner())
}

/// `data:image/png;base64,...` form used for inline image inputs
pub fn encode_data_url(image: &DynamicImage) -> ProviderResult<String> {
    let png = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

pub fn decode_image_bytes(provider: &str, bytes: &[u8]) -> ProviderResult<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| ProviderError::data_integrity(provider, format!("undecodable image: {e}")))
}

pub fn decode_base64_image(provider: &str, encoded: &str) -> ProviderResult<DynamicImage> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ProviderError::data_integrity(provider, format!("invalid base64 image: {e}")))?;
    decode_image_bytes(provider, &bytes)
}

/// Run disk or pixel work on the blocking pool so runtime threads keep serving timers and progress
pub async fn off_runtime<T, F>(provider: &str, work: F) -> ProviderResult<T>
where
    F: FnOnce() -> ProviderResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ProviderError::worker(provider, &e))?
}

/// [`load_image`] then [`encode_png`], off the runtime
pub async fn load_png(provider: &'static str, path: &Path, max_edge: u32) -> ProviderResult<Vec<u8>> {
    let path = path.to_path_buf();
    off_runtime(provider, move || encode_png(&load_image(provider, &path, max_edge)?)).await
}

/// [`load_image`] then [`encode_data_url`], off the runtime
pub async fn load_data_url(provider: &'static str, path: &Path, max_edge: u32) -> ProviderResult<String> {
    let path = path.to_path_buf();
    off_runtime(provider, move || encode_data_url(&load_image(provider, &path, max_edge)?)).await
}

/// [`decode_image_bytes`] off the runtime
pub async fn decode_image(provider: &'static str, bytes: Vec<u8>) -> ProviderResult<DynamicImage> {
    off_runtime(provider, move || decode_image_bytes(provider, &bytes)).await
}

/// [`decode_base64_image`] off the runtime
pub async fn decode_base64(provider: &'static str, encoded: String) -> ProviderResult<DynamicImage> {
    off_runtime(provider, move || decode_base64_image(provider, &encoded)).await
}

/// Fetch an output image with a plain GET
pub async fn download_image(client: &reqwest::Client, provider: &'static str, url: &str) -> ProviderResult<DynamicImage> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| transport(provider, "image download failed", e))?;
    let response = ensure_success(provider, response).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport(provider, "image download interrupted", e))?;
    decode_image(provider, bytes.to_vec()).await
}
