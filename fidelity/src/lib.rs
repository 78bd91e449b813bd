//! Post-hoc similarity scoring between a garment image and a generated image
//!
//! Three signals are combined: structural similarity on luma, per-channel
//! color histogram correlation, and the share of keypoints that match
//! between the two images. A result passes only when all three reach
//! their thresholds.

pub mod heatmap;
pub mod histogram;
pub mod keypoints;
pub mod luma;
pub mod ssim;

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::luma::LumaPlane;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FidelityError {
    #[error("Threshold {name} must be within 0..=1, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

pub type FidelityResult<T> = Result<T, FidelityError>;

/// Similarity of one generated image to its source garment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FidelityScore {
    pub ssim: f64,
    pub color_hist_correlation: f64,
    pub keypoint_match_ratio: f64,
}

impl FidelityScore {
    pub fn zero() -> Self {
        Self {
            ssim: 0.0,
            color_hist_correlation: 0.0,
            keypoint_match_ratio: 0.0,
        }
    }
}

/// Minimum score for each signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FidelityThresholds {
    pub ssim: f64,
    pub color_hist: f64,
    pub keypoint: f64,
}

impl Default for FidelityThresholds {
    fn default() -> Self {
        Self {
            ssim: 0.85,
            color_hist: 0.90,
            keypoint: 0.80,
        }
    }
}

impl FidelityThresholds {
    pub fn new(ssim: f64, color_hist: f64, keypoint: f64) -> FidelityResult<Self> {
        for (name, value) in [("ssim", ssim), ("color_hist", color_hist), ("keypoint", keypoint)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FidelityError::InvalidThreshold { name, value });
            }
        }
        Ok(Self {
            ssim,
            color_hist,
            keypoint,
        })
    }
}

/// Scores generated images against their source garment
#[derive(Debug, Clone, Default)]
pub struct FidelityScorer {
    thresholds: FidelityThresholds,
}

impl FidelityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: FidelityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &FidelityThresholds {
        &self.thresholds
    }

    /// Score against a source on disk; an unreadable source scores zero
    pub fn evaluate(&self, source_path: &Path, generated: &DynamicImage) -> FidelityScore {
        match image::open(source_path) {
            Ok(source) => self.evaluate_images(&source, generated),
            Err(e) => {
                warn!("Cannot read source image {}: {}", source_path.display(), e);
                FidelityScore::zero()
            }
        }
    }

    /// Score an in-memory source. The source is resized to the generated
    /// image, never the other way round.
    pub fn evaluate_images(&self, source: &DynamicImage, generated: &DynamicImage) -> FidelityScore {
        let generated = generated.to_rgb8();
        let source = Self::match_size(source, &generated);

        let score = FidelityScore {
            ssim: ssim::ssim(&LumaPlane::from_rgb(&source), &LumaPlane::from_rgb(&generated)),
            color_hist_correlation: histogram::color_hist_correlation(&source, &generated),
            keypoint_match_ratio: keypoints::match_ratio(
                &LumaPlane::from_rgb(&source).to_gray8(),
                &LumaPlane::from_rgb(&generated).to_gray8(),
            ),
        };
        debug!(
            "Fidelity ssim={:.3} hist={:.3} keypoints={:.3}",
            score.ssim, score.color_hist_correlation, score.keypoint_match_ratio
        );
        score
    }

    /// Every signal at or above its threshold
    pub fn pass(&self, score: &FidelityScore) -> bool {
        score.ssim >= self.thresholds.ssim
            && score.color_hist_correlation >= self.thresholds.color_hist
            && score.keypoint_match_ratio >= self.thresholds.keypoint
    }

    /// Difference heatmap; falls back to the generated image when the
    /// source cannot be read
    pub fn heatmap(&self, source_path: &Path, generated: &DynamicImage) -> DynamicImage {
        match image::open(source_path) {
            Ok(source) => {
                let generated_rgb = generated.to_rgb8();
                let source = Self::match_size(&source, &generated_rgb);
                DynamicImage::ImageRgb8(heatmap::difference_heatmap(&source, &generated_rgb))
            }
            Err(e) => {
                warn!("Cannot read source image {}: {}", source_path.display(), e);
                generated.clone()
            }
        }
    }

    fn match_size(source: &DynamicImage, generated: &RgbImage) -> RgbImage {
        let (width, height) = generated.dimensions();
        if source.width() == width && source.height() == height {
            source.to_rgb8()
        } else {
            source.resize_exact(width, height, FilterType::Lanczos3).to_rgb8()
        }
    }
}
