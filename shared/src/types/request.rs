//! Request-side data model: garments, subject descriptors and output config

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

/// Category of a garment image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GarmentCategory {
    Top,
    Bottom,
    Outer,
    OnePiece,
    Accessory,
}

impl GarmentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GarmentCategory::Top => "TOP",
            GarmentCategory::Bottom => "BOTTOM",
            GarmentCategory::Outer => "OUTER",
            GarmentCategory::OnePiece => "ONE_PIECE",
            GarmentCategory::Accessory => "ACCESSORY",
        }
    }

    /// Short noun phrase used when describing the outfit in a prompt
    pub fn prompt_noun(&self) -> &'static str {
        match self {
            GarmentCategory::Top => "a top/shirt",
            GarmentCategory::Bottom => "pants/trousers",
            GarmentCategory::Outer => "a jacket/outerwear",
            GarmentCategory::OnePiece => "a dress/outfit",
            GarmentCategory::Accessory => "accessories",
        }
    }
}

impl fmt::Display for GarmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GarmentCategory {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "TOP" => Ok(GarmentCategory::Top),
            "BOTTOM" => Ok(GarmentCategory::Bottom),
            "OUTER" => Ok(GarmentCategory::Outer),
            "ONE_PIECE" => Ok(GarmentCategory::OnePiece),
            "ACCESSORY" => Ok(GarmentCategory::Accessory),
            _ => Err(SharedError::UnknownVariant {
                kind: "garment category",
                value: s.to_string(),
            }),
        }
    }
}

/// Reference to an uploaded garment image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentRef {
    pub image_path: PathBuf,
    pub category: GarmentCategory,
    /// Dominant colors as hex strings
    pub colors: Vec<String>,
    pub description: String,
}

impl GarmentRef {
    /// Create a garment reference, checking that the image exists
    pub fn new(image_path: impl Into<PathBuf>, category: GarmentCategory) -> SharedResult<Self> {
        let image_path = image_path.into();
        if !image_path.exists() {
            return Err(SharedError::MissingImage {
                path: image_path.display().to_string(),
            });
        }

        Ok(Self {
            image_path,
            category,
            colors: Vec::new(),
            description: String::new(),
        })
    }

    pub fn with_colors(mut self, colors: Vec<String>) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn file_name(&self) -> String {
        self.image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> String {
        format!("{}: {}", self.category, self.file_name())
    }
}

/// Demographic, pose and background descriptors for the generated subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAttributes {
    pub gender: String,
    pub age_range: String,
    pub ethnicity: String,
    pub body_type: String,
    pub height: String,
    pub pose: String,
    pub background: String,
    pub custom_description: Option<String>,
    /// Person image used by try-on backends
    pub reference_person: Option<PathBuf>,
}

impl Default for SubjectAttributes {
    fn default() -> Self {
        Self {
            gender: "female".to_string(),
            age_range: "20s".to_string(),
            ethnicity: "asian".to_string(),
            body_type: "standard".to_string(),
            height: "standard".to_string(),
            pose: "front".to_string(),
            background: "white".to_string(),
            custom_description: None,
            reference_person: None,
        }
    }
}

impl SubjectAttributes {
    pub fn with_reference_person(mut self, path: impl AsRef<Path>) -> Self {
        self.reference_person = Some(path.as_ref().to_path_buf());
        self
    }

    /// Region phrase used by the prompt builder
    pub fn region_phrase(&self) -> &'static str {
        match self.ethnicity.as_str() {
            "asian" => "from Asia",
            "european" => "from Europe",
            "african" => "from Africa",
            "american" => "from the Americas",
            "oceanian" => "from Oceania",
            "mixed" => "of mixed heritage",
            _ => "",
        }
    }
}

/// Number of outputs requested in one call, always within 1..=4
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OutputCount(u8);

impl OutputCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub const ONE: OutputCount = OutputCount(1);

    pub fn new(count: u8) -> SharedResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&count) {
            Ok(Self(count))
        } else {
            Err(SharedError::InvalidCount { count })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for OutputCount {
    type Error = SharedError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        OutputCount::new(value)
    }
}

impl From<OutputCount> for u8 {
    fn from(count: OutputCount) -> Self {
        count.0
    }
}

impl fmt::Display for OutputCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output image size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    #[serde(rename = "512x512")]
    Square512,
    #[default]
    #[serde(rename = "1024x1024")]
    Square1024,
    #[serde(rename = "1024x1792")]
    Portrait,
    #[serde(rename = "1792x1024")]
    Landscape,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Square512 => "512x512",
            Resolution::Square1024 => "1024x1024",
            Resolution::Portrait => "1024x1792",
            Resolution::Landscape => "1792x1024",
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Square512 => (512, 512),
            Resolution::Square1024 => (1024, 1024),
            Resolution::Portrait => (1024, 1792),
            Resolution::Landscape => (1792, 1024),
        }
    }

    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Resolution::Square512 | Resolution::Square1024 => "1:1",
            Resolution::Portrait => "9:16",
            Resolution::Landscape => "16:9",
        }
    }

    pub fn is_square(&self) -> bool {
        matches!(self, Resolution::Square512 | Resolution::Square1024)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "512x512" => Ok(Resolution::Square512),
            "1024x1024" => Ok(Resolution::Square1024),
            "1024x1792" => Ok(Resolution::Portrait),
            "1792x1024" => Ok(Resolution::Landscape),
            _ => Err(SharedError::UnknownVariant {
                kind: "resolution",
                value: s.to_string(),
            }),
        }
    }
}

/// Provider quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    Standard,
    Hd,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Standard => "standard",
            QualityTier::Hd => "hd",
        }
    }
}

impl FromStr for QualityTier {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(QualityTier::Standard),
            "hd" => Ok(QualityTier::Hd),
            _ => Err(SharedError::UnknownVariant {
                kind: "quality tier",
                value: s.to_string(),
            }),
        }
    }
}

/// Output configuration for one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub count: OutputCount,
    pub resolution: Resolution,
    pub quality: QualityTier,
    pub seed: Option<i64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            count: OutputCount::ONE,
            resolution: Resolution::default(),
            quality: QualityTier::default(),
            seed: None,
        }
    }
}

impl OutputConfig {
    pub fn with_count(count: u8) -> SharedResult<Self> {
        Ok(Self {
            count: OutputCount::new(count)?,
            ..Self::default()
        })
    }
}

/// Immutable request for one orchestration call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub garments: Vec<GarmentRef>,
    pub subject: SubjectAttributes,
    pub config: OutputConfig,
}

impl GenerationRequest {
    pub fn new(garments: Vec<GarmentRef>, subject: SubjectAttributes, config: OutputConfig) -> Self {
        Self {
            garments,
            subject,
            config,
        }
    }

    pub fn count(&self) -> OutputCount {
        self.config.count
    }

    /// Copy of this request with a different output count
    pub fn with_count(&self, count: OutputCount) -> Self {
        let mut derived = self.clone();
        derived.config.count = count;
        derived
    }

    /// Copy of this request with a fixed seed
    pub fn with_seed(&self, seed: i64) -> Self {
        let mut derived = self.clone();
        derived.config.seed = Some(seed);
        derived
    }

    /// Copy of this request with different subject descriptors
    pub fn with_subject(&self, subject: SubjectAttributes) -> Self {
        let mut derived = self.clone();
        derived.subject = subject;
        derived
    }
}

/// Seed shared by every sub-request of one multi-angle run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedContext {
    pub seed: i64,
}

impl SeedContext {
    pub fn new(seed: i64) -> Self {
        Self { seed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_count_bounds() {
        assert!(OutputCount::new(0).is_err());
        assert_eq!(OutputCount::new(1).unwrap().get(), 1);
        assert_eq!(OutputCount::new(4).unwrap().get(), 4);
        assert_eq!(OutputCount::new(5), Err(SharedError::InvalidCount { count: 5 }));
    }

    #[test]
    fn test_output_count_rejected_on_deserialize() {
        let ok: Result<OutputConfig, _> =
            serde_json::from_str(r#"{"count":3,"resolution":"1024x1024","quality":"hd","seed":null}"#);
        assert_eq!(ok.unwrap().count.get(), 3);

        let bad: Result<OutputConfig, _> =
            serde_json::from_str(r#"{"count":9,"resolution":"1024x1024","quality":"hd","seed":null}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_garment_category_parsing() {
        assert_eq!("top".parse::<GarmentCategory>().unwrap(), GarmentCategory::Top);
        assert_eq!("one-piece".parse::<GarmentCategory>().unwrap(), GarmentCategory::OnePiece);
        assert!("hat".parse::<GarmentCategory>().is_err());
        assert_eq!(
            serde_json::to_string(&GarmentCategory::OnePiece).unwrap(),
            "\"ONE_PIECE\""
        );
    }

    #[test]
    fn test_garment_ref_requires_existing_file() {
        let missing = GarmentRef::new("/definitely/not/here.png", GarmentCategory::Top);
        assert!(matches!(missing, Err(SharedError::MissingImage { .. })));

        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        let garment = GarmentRef::new(file.path(), GarmentCategory::Bottom).unwrap();
        assert!(garment.display_name().starts_with("BOTTOM: "));
        assert!(garment.display_name().ends_with(".png"));
    }

    #[test]
    fn test_resolution_aspect_ratio() {
        assert_eq!(Resolution::Square1024.aspect_ratio(), "1:1");
        assert_eq!(Resolution::Portrait.aspect_ratio(), "9:16");
        assert_eq!(Resolution::Landscape.aspect_ratio(), "16:9");
        assert_eq!("1792x1024".parse::<Resolution>().unwrap(), Resolution::Landscape);
    }

    #[test]
    fn test_request_derivations_leave_original_untouched() {
        let request = GenerationRequest::new(
            Vec::new(),
            SubjectAttributes::default(),
            OutputConfig::with_count(3).unwrap(),
        );

        let single = request.with_count(OutputCount::ONE).with_seed(42);
        assert_eq!(single.count().get(), 1);
        assert_eq!(single.config.seed, Some(42));
        assert_eq!(request.count().get(), 3);
        assert_eq!(request.config.seed, None);
    }
}
