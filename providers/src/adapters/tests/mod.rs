//! Adapter tests against local HTTP doubles
//!
//! Every adapter is pointed at a wiremock server; nothing here talks to a
//! real backend.


use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, Rgb, RgbImage};
use shared::{
    FaithfulPromptBuilder, GarmentCategory, GarmentRef, GenerationRequest, OutputConfig, PromptBuilder,
    SubjectAttributes,
};

pub fn prompts() -> Arc<dyn PromptBuilder> {
    Arc::new(FaithfulPromptBuilder::new())
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 120, 200])));
    crate::http::encode_png(&image).unwrap()
}

pub fn png_base64(width: u32, height: u32) -> String {
    STANDARD.encode(png_bytes(width, height))
}

/// Write a small PNG into `dir` and return its path
pub fn write_png(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, png_bytes(16, 16)).unwrap();
    path
}

pub fn request_with_garment(dir: &tempfile::TempDir, count: u8) -> GenerationRequest {
    let garment = GarmentRef::new(write_png(dir, "shirt.png"), GarmentCategory::Top).unwrap();
    GenerationRequest::new(
        vec![garment],
        SubjectAttributes::default(),
        OutputConfig::with_count(count).unwrap(),
    )
}

pub fn text_only_request(count: u8) -> GenerationRequest {
    GenerationRequest::new(
        Vec::new(),
        SubjectAttributes::default(),
        OutputConfig::with_count(count).unwrap(),
    )
}
