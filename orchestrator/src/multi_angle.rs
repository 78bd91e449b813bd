//! Multi-angle generation
//!
//! Produces one image per camera angle for the same garments and subject.
//! Every angle shares one seed so the runs stay visually consistent.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::DynamicImage;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use shared::logging::{self, Component};
use shared::{component_info, GenerationRequest, OutputCount, ProgressReporter, ProgressSink, SeedContext, SharedError};

use crate::orchestrator::GenerationRunner;

/// Upper bound of the randomly drawn shared seed
pub const MAX_RANDOM_SEED: i64 = 1_000_000;

/// Camera angle around the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Angle {
    Front,
    FrontThreeQuarter,
    Side,
    BackThreeQuarter,
    Back,
    FrontThreeQuarterLeft,
    SideLeft,
}

impl Angle {
    pub const ALL: [Angle; 7] = [
        Angle::Front,
        Angle::FrontThreeQuarter,
        Angle::Side,
        Angle::BackThreeQuarter,
        Angle::Back,
        Angle::FrontThreeQuarterLeft,
        Angle::SideLeft,
    ];

    /// Rotation in degrees; negative values turn to the subject's left
    pub fn degrees(&self) -> i16 {
        match self {
            Angle::Front => 0,
            Angle::FrontThreeQuarter => 45,
            Angle::Side => 90,
            Angle::BackThreeQuarter => 135,
            Angle::Back => 180,
            Angle::FrontThreeQuarterLeft => -45,
            Angle::SideLeft => -90,
        }
    }

    pub fn from_degrees(degrees: i16) -> Option<Angle> {
        Angle::ALL.into_iter().find(|a| a.degrees() == degrees)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Angle::Front => "Front",
            Angle::FrontThreeQuarter => "Front three-quarter",
            Angle::Side => "Side",
            Angle::BackThreeQuarter => "Back three-quarter",
            Angle::Back => "Back",
            Angle::FrontThreeQuarterLeft => "Front three-quarter (left)",
            Angle::SideLeft => "Side (left)",
        }
    }

    /// Value written to `SubjectAttributes::pose`
    pub fn pose_key(&self) -> &'static str {
        match self {
            Angle::Front => "front",
            Angle::FrontThreeQuarter => "three_quarter_front",
            Angle::Side => "side",
            Angle::BackThreeQuarter => "three_quarter_back",
            Angle::Back => "back",
            Angle::FrontThreeQuarterLeft => "three_quarter_front_left",
            Angle::SideLeft => "side_left",
        }
    }

    pub fn pose_description(&self) -> &'static str {
        match self {
            Angle::Front => "standing straight, facing directly at camera, front view, full body visible from head to feet",
            Angle::FrontThreeQuarter => {
                "standing at three-quarter front view, 45 degrees angle, slightly turned, full body visible"
            }
            Angle::Side => "standing in profile view, side pose, 90 degrees angle, full body visible from head to feet",
            Angle::BackThreeQuarter => {
                "standing at three-quarter back view, 135 degrees angle, slightly turned away, full body visible"
            }
            Angle::Back => {
                "standing facing away from camera, back view, 180 degrees angle, full body visible from head to feet"
            }
            Angle::FrontThreeQuarterLeft => {
                "standing at three-quarter front view from left, 45 degrees angle, slightly turned to the left, full body visible"
            }
            Angle::SideLeft => {
                "standing in profile view from left side, 90 degrees angle, full body visible from head to feet"
            }
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}°)", self.display_name(), self.degrees())
    }
}

/// Accepts a pose key (`three_quarter_back`) or a degree value (`135`)
impl FromStr for Angle {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(degrees) = trimmed.parse::<i16>() {
            if let Some(angle) = Angle::from_degrees(degrees) {
                return Ok(angle);
            }
        }
        let key = trimmed.to_lowercase().replace('-', "_");
        Angle::ALL
            .into_iter()
            .find(|a| a.pose_key() == key)
            .ok_or_else(|| SharedError::UnknownVariant {
                kind: "angle",
                value: s.to_string(),
            })
    }
}

/// Named angle sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnglePreset {
    FrontBack,
    FrontSideBack,
    Four,
    Full,
}

impl AnglePreset {
    pub fn angles(&self) -> Vec<Angle> {
        match self {
            AnglePreset::FrontBack => vec![Angle::Front, Angle::Back],
            AnglePreset::FrontSideBack => vec![Angle::Front, Angle::Side, Angle::Back],
            AnglePreset::Four => vec![
                Angle::Front,
                Angle::FrontThreeQuarter,
                Angle::Side,
                Angle::BackThreeQuarter,
            ],
            AnglePreset::Full => Angle::ALL.to_vec(),
        }
    }
}

/// Default angle set for a requested number of outputs
pub fn get_angles(count: usize) -> Vec<Angle> {
    match count {
        2 => AnglePreset::FrontBack.angles(),
        3 => AnglePreset::FrontSideBack.angles(),
        n if n >= 4 => AnglePreset::Four.angles(),
        _ => vec![Angle::Front],
    }
}

/// Rewrite the free-text description for a new angle. An existing `Pose:`
/// segment is replaced and any `Background:` segment after it is kept.
fn angle_description(base: Option<&str>, angle: Angle) -> String {
    let pose = angle.pose_description();
    let base = base.unwrap_or("");
    if base.is_empty() {
        return format!("Pose: {pose}");
    }

    match base.split_once("Pose:") {
        Some((before, _)) => match base.split_once("Background:") {
            Some((_, background)) => format!("{before}Pose: {pose}. Background:{background}")
                .trim()
                .to_string(),
            None => format!("{before}Pose: {pose}").trim().to_string(),
        },
        None => format!("{base}. Pose: {pose}").trim().to_string(),
    }
}

/// Single-image request for one angle. Garments and background are kept;
/// the pose, description and seed change.
pub fn derive_angle_request(base: &GenerationRequest, angle: Angle, seed: &SeedContext) -> GenerationRequest {
    let mut subject = base.subject.clone();
    subject.pose = angle.pose_key().to_string();
    subject.custom_description = Some(angle_description(base.subject.custom_description.as_deref(), angle));

    base.with_subject(subject)
        .with_count(OutputCount::ONE)
        .with_seed(seed.seed)
}

/// Result of one angle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleOutcome {
    pub angle: Angle,
    pub degrees: i16,
    pub image_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AngleOutcome {
    pub fn succeeded(angle: Angle, image_count: usize) -> Self {
        Self {
            angle,
            degrees: angle.degrees(),
            image_count,
            error: None,
        }
    }

    pub fn failed(angle: Angle, error: impl Into<String>) -> Self {
        Self {
            angle,
            degrees: angle.degrees(),
            image_count: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiAngleMetadata {
    pub seed: i64,
    pub total_angles: usize,
    pub generated_images: usize,
    pub angles: Vec<AngleOutcome>,
}

impl MultiAngleMetadata {
    pub fn succeeded_angles(&self) -> Vec<Angle> {
        self.angles.iter().filter(|o| o.is_success()).map(|o| o.angle).collect()
    }
}

#[derive(Debug, Clone)]
pub struct MultiAngleResult {
    pub images: Vec<DynamicImage>,
    pub metadata: MultiAngleMetadata,
}

impl MultiAngleResult {
    pub fn succeeded_angles(&self) -> Vec<Angle> {
        self.metadata.succeeded_angles()
    }
}

/// Runs one request per angle, in order, through a [`GenerationRunner`]
pub struct MultiAngleCoordinator<R: GenerationRunner + ?Sized> {
    runner: Arc<R>,
    progress: ProgressReporter,
}

impl<R: GenerationRunner + ?Sized> MultiAngleCoordinator<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            runner,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = ProgressReporter::new(sink);
        self
    }

    /// Generate every angle. A failing angle is logged and recorded, the
    /// remaining angles still run.
    pub async fn run(&self, request: &GenerationRequest, angles: &[Angle]) -> MultiAngleResult {
        let progress = self.progress.fresh();
        let seed = SeedContext::new(
            request
                .config
                .seed
                .unwrap_or_else(|| rand::thread_rng().gen_range(0..=MAX_RANDOM_SEED)),
        );
        let total = angles.len();
        component_info!(
            Component::Orchestrator,
            "🚀 Multi-angle run over {} angle(s) with seed {}",
            total,
            seed.seed
        );

        let mut images = Vec::new();
        let mut outcomes = Vec::with_capacity(total);

        for (i, angle) in angles.iter().copied().enumerate() {
            progress.report(
                &format!("Angle {}/{}: {}", i + 1, total, angle.display_name()),
                (10 + 80 * i / total) as u8,
            );
            let angle_request = derive_angle_request(request, angle, &seed);
            debug!("Generating {} with pose {}", angle, angle_request.subject.pose);

            let outcome = match self.runner.run(&angle_request).await {
                Ok(result) if !result.is_empty() => {
                    let outcome = AngleOutcome::succeeded(angle, result.images.len());
                    images.extend(result.images);
                    outcome
                }
                Ok(_) => {
                    logging::log_partial_failure(&Component::Orchestrator, &angle.to_string(), &"no images returned");
                    AngleOutcome::failed(angle, "no images returned")
                }
                Err(e) => {
                    logging::log_partial_failure(&Component::Orchestrator, &angle.to_string(), &e);
                    AngleOutcome::failed(angle, e.to_string())
                }
            };
            outcomes.push(outcome);
        }

        progress.report("Multi-angle generation complete", 100);
        let metadata = MultiAngleMetadata {
            seed: seed.seed,
            total_angles: total,
            generated_images: images.len(),
            angles: outcomes,
        };
        logging::log_success(
            &Component::Orchestrator,
            &format!(
                "Multi-angle produced {} image(s) from {}/{} angle(s)",
                metadata.generated_images,
                metadata.succeeded_angles().len(),
                total
            ),
        );
        MultiAngleResult { images, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{OutputConfig, SubjectAttributes};

    fn request_with_description(description: Option<&str>) -> GenerationRequest {
        let subject = SubjectAttributes {
            custom_description: description.map(str::to_string),
            background: "studio grey".to_string(),
            ..SubjectAttributes::default()
        };
        GenerationRequest::new(Vec::new(), subject, OutputConfig::with_count(3).unwrap())
    }

    #[test]
    fn test_get_angles_defaults() {
        assert_eq!(get_angles(0), vec![Angle::Front]);
        assert_eq!(get_angles(1), vec![Angle::Front]);
        assert_eq!(get_angles(2), vec![Angle::Front, Angle::Back]);
        assert_eq!(get_angles(3), vec![Angle::Front, Angle::Side, Angle::Back]);
        assert_eq!(get_angles(7), AnglePreset::Four.angles());
        assert_eq!(AnglePreset::Full.angles().len(), 7);
    }

    #[test]
    fn test_angle_parsing() {
        assert_eq!("135".parse::<Angle>().unwrap(), Angle::BackThreeQuarter);
        assert_eq!("-90".parse::<Angle>().unwrap(), Angle::SideLeft);
        assert_eq!("three-quarter-front".parse::<Angle>().unwrap(), Angle::FrontThreeQuarter);
        assert!("30".parse::<Angle>().is_err());
    }

    #[test]
    fn test_description_appended_when_no_pose() {
        let request = request_with_description(Some("Freckles"));
        let derived = derive_angle_request(&request, Angle::Back, &SeedContext::new(9));

        assert_eq!(
            derived.subject.custom_description.as_deref(),
            Some(format!("Freckles. Pose: {}", Angle::Back.pose_description()).as_str())
        );
        assert_eq!(derived.subject.pose, "back");
        assert_eq!(derived.subject.background, "studio grey");
        assert_eq!(derived.count(), OutputCount::ONE);
        assert_eq!(derived.config.seed, Some(9));
    }

    #[test]
    fn test_existing_pose_is_replaced_and_background_kept() {
        let request = request_with_description(Some("Smiling. Pose: arms crossed. Background: beach"));
        let derived = derive_angle_request(&request, Angle::Side, &SeedContext::new(1));

        assert_eq!(
            derived.subject.custom_description.unwrap(),
            format!("Smiling. Pose: {}. Background: beach", Angle::Side.pose_description())
        );
    }

    #[test]
    fn test_existing_pose_is_replaced() {
        let request = request_with_description(Some("Pose: sitting"));
        let derived = derive_angle_request(&request, Angle::Front, &SeedContext::new(1));

        assert_eq!(
            derived.subject.custom_description.unwrap(),
            format!("Pose: {}", Angle::Front.pose_description())
        );
    }

    #[test]
    fn test_empty_description_becomes_pose() {
        let request = request_with_description(None);
        let derived = derive_angle_request(&request, Angle::SideLeft, &SeedContext::new(1));

        assert_eq!(
            derived.subject.custom_description.unwrap(),
            format!("Pose: {}", Angle::SideLeft.pose_description())
        );
    }

    #[test]
    fn test_metadata_serializes_angle_keys() {
        let metadata = MultiAngleMetadata {
            seed: 5,
            total_angles: 2,
            generated_images: 1,
            angles: vec![
                AngleOutcome::succeeded(Angle::Front, 1),
                AngleOutcome::failed(Angle::Back, "boom"),
            ],
        };

        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["angles"][0]["angle"], "front");
        assert_eq!(json["angles"][1]["degrees"], 180);
        assert_eq!(metadata.succeeded_angles(), vec![Angle::Front]);
    }
}
