//! Prompt-builder contract and the default faithful-reproduction builder

use crate::types::{GarmentRef, OutputConfig, SubjectAttributes};

/// Positive and negative prompt for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub prompt: String,
    pub negative_prompt: String,
}

/// Pure function from request parts to prompt text
#[mockall::automock]
pub trait PromptBuilder: Send + Sync {
    fn build(&self, garments: &[GarmentRef], subject: &SubjectAttributes, config: &OutputConfig) -> PromptPair;
}

const PHOTO_STYLE: &str = "full body portrait showing entire person from head to feet, \
professional studio photograph, even lighting, plain white background";

const NEGATIVE_PROMPT: &str = "no person, no human, no model, only clothing, clothing only, garment only, \
flat lay, product photo, clothing without person, empty clothing, \
hanger, mannequin without body, invisible person, \
cropped body, partial body, upper body only, portrait, headshot, close-up, \
cut off feet, cut off head, cut off legs, \
painting, illustration, drawing, anime, cartoon, 3D render, \
blur, low quality, distorted, deformed, bad anatomy";

/// Builds prompts that put the person first and ask for the garments
/// from the reference image to be reproduced as-is.
#[derive(Debug, Clone, Default)]
pub struct FaithfulPromptBuilder;

impl FaithfulPromptBuilder {
    pub fn new() -> Self {
        Self
    }

    fn subject_description(subject: &SubjectAttributes) -> String {
        let region = subject.region_phrase();
        let person = if region.is_empty() {
            format!("A REAL HUMAN {} fashion model", subject.gender)
        } else {
            format!("A REAL HUMAN {} fashion model {}", subject.gender, region)
        };

        format!(
            "{}, {} years old, {} body type",
            person, subject.age_range, subject.body_type
        )
    }

    fn outfit_description(garments: &[GarmentRef]) -> String {
        if garments.is_empty() {
            return "A professional fashion model in a full body photo".to_string();
        }

        let pieces: Vec<&str> = garments.iter().map(|g| g.category.prompt_noun()).collect();
        format!(
            "A professional fashion model wearing {} with colors and patterns from the reference image",
            pieces.join(" and ")
        )
    }
}

impl PromptBuilder for FaithfulPromptBuilder {
    fn build(&self, garments: &[GarmentRef], subject: &SubjectAttributes, _config: &OutputConfig) -> PromptPair {
        let mut prompt = format!(
            "GENERATE A PHOTOGRAPH OF: {}. COMPOSITION: {}. OUTFIT: {}. ",
            Self::subject_description(subject),
            PHOTO_STYLE,
            Self::outfit_description(garments),
        );

        if let Some(details) = subject.custom_description.as_deref().filter(|d| !d.trim().is_empty()) {
            prompt.push_str(&format!("DETAILS: {}. ", details.trim()));
        }

        prompt.push_str(
            "IMPORTANT: This must show a REAL HUMAN PERSON wearing clothing, NOT just the clothing item alone.",
        );

        PromptPair {
            prompt,
            negative_prompt: NEGATIVE_PROMPT.to_string(),
        }
    }
}
