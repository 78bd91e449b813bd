//! Request and image fixtures shared by the orchestrator test suites

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use shared::{GarmentCategory, GarmentRef, GenerationRequest, OutputConfig, SubjectAttributes};

pub const IMAGE_EDGE: u32 = 64;

/// Solid 64×64 image of one color
pub fn solid_image(color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(IMAGE_EDGE, IMAGE_EDGE, Rgb(color)))
}

/// Save a small PNG and return its path
pub fn write_garment(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    solid_image([120, 30, 30]).save(&path).unwrap();
    path
}

pub fn garment(dir: &Path, name: &str, category: GarmentCategory) -> GarmentRef {
    GarmentRef::new(write_garment(dir, name), category).unwrap()
}

/// Request over the given garments with `count` outputs
pub fn request(garments: Vec<GarmentRef>, count: u8) -> GenerationRequest {
    GenerationRequest::new(garments, SubjectAttributes::default(), OutputConfig::with_count(count).unwrap())
}

/// Text-only request, enough for fake adapters and runners
pub fn bare_request(count: u8) -> GenerationRequest {
    request(Vec::new(), count)
}
