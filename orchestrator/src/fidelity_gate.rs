//! Fidelity gate: keep only generated images that resemble every source garment
//!
//! Each image is scored against each garment with [`FidelityScorer`]. An
//! image is accepted when every garment score passes. Per-image reports are
//! stored in `metadata.diagnostics["fidelity"]`.

use fidelity::{FidelityScore, FidelityScorer};
use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, warn};

use shared::logging::Component;
use shared::{component_info, GarmentRef, GenerationResult};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Score of one image against one garment
#[derive(Debug, Clone, Serialize)]
pub struct GarmentScore {
    pub garment: String,
    pub score: FidelityScore,
    pub passed: bool,
}

/// All garment scores for one generated image
#[derive(Debug, Clone, Serialize)]
pub struct ImageFidelity {
    pub index: usize,
    pub accepted: bool,
    pub scores: Vec<GarmentScore>,
}

/// Score every image against every garment. Each garment is read once; an
/// unreadable garment scores zero and rejects every image.
pub fn score_images(scorer: &FidelityScorer, garments: &[GarmentRef], images: &[DynamicImage]) -> Vec<ImageFidelity> {
    let sources: Vec<(String, Option<DynamicImage>)> = garments
        .iter()
        .map(|garment| {
            let source = image::open(&garment.image_path)
                .map_err(|e| warn!("Cannot read garment {}: {}", garment.image_path.display(), e))
                .ok();
            (garment.display_name(), source)
        })
        .collect();

    images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let scores: Vec<GarmentScore> = sources
                .iter()
                .map(|(name, source)| {
                    let score = match source {
                        Some(source) => scorer.evaluate_images(source, image),
                        None => FidelityScore::zero(),
                    };
                    GarmentScore {
                        garment: name.clone(),
                        score,
                        passed: scorer.pass(&score),
                    }
                })
                .collect();
            ImageFidelity {
                index,
                accepted: scores.iter().all(|s| s.passed),
                scores,
            }
        })
        .collect()
}

/// Drop images that fail fidelity against any garment.
///
/// Scoring runs on the blocking pool. A request without garments has
/// nothing to compare against and is returned untouched.
pub async fn validate_fidelity(
    result: GenerationResult,
    garments: &[GarmentRef],
    scorer: &FidelityScorer,
) -> OrchestratorResult<GenerationResult> {
    if garments.is_empty() || result.images.is_empty() {
        return Ok(result);
    }

    let GenerationResult { images, mut metadata } = result;
    let scorer = scorer.clone();
    let garments = garments.to_vec();
    let (images, reports) = tokio::task::spawn_blocking(move || {
        let reports = score_images(&scorer, &garments, &images);
        (images, reports)
    })
    .await
    .map_err(|e| OrchestratorError::fidelity_worker(&e))?;

    let kept: Vec<DynamicImage> = images
        .into_iter()
        .zip(&reports)
        .filter_map(|(image, report)| report.accepted.then_some(image))
        .collect();
    let rejected = reports.len() - kept.len();
    debug!("Fidelity kept {} of {} images", kept.len(), reports.len());
    if rejected > 0 {
        component_info!(
            Component::Fidelity,
            "🔍 Rejected {} of {} image(s) below fidelity thresholds",
            rejected,
            reports.len()
        );
    }

    metadata.total_images = kept.len();
    metadata
        .diagnostics
        .insert("fidelity".to_string(), serde_json::to_value(&reports)?);
    metadata
        .diagnostics
        .insert("fidelity_rejected".to_string(), rejected.into());

    Ok(GenerationResult::new(kept, metadata))
}
