//! Command line interface definitions for the orchestrator binary

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use providers::ProviderKind;
use shared::{GarmentCategory, GarmentRef, OutputConfig, OutputCount, QualityTier, Resolution, SharedResult, SubjectAttributes};

use crate::multi_angle::Angle;

/// Virtual try-on image generation
#[derive(Parser, Debug)]
#[command(name = "orchestrator")]
#[command(about = "Generates model photos wearing the given garments through pluggable image providers")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error); overrides LOG_LEVEL
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output directory; overrides OUTPUT_DIR
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Maximum concurrent provider calls; overrides MAX_PARALLEL
    #[arg(long, global = true)]
    pub max_parallel: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate images for one garment set
    Generate(RequestArgs),

    /// Generate one image per camera angle with a shared seed
    MultiAngle {
        #[command(flatten)]
        request: RequestArgs,

        /// Comma-separated angles as degrees or pose keys; defaults follow --count
        #[arg(long, value_delimiter = ',')]
        angles: Vec<Angle>,

        /// All seven angles
        #[arg(long, conflicts_with = "angles")]
        full: bool,
    },

    /// Run every garment in a directory, optionally paired with bottoms
    Batch {
        #[arg(long, default_value = "openai")]
        provider: ProviderKind,

        /// Directory of top garments
        #[arg(long)]
        tops: PathBuf,

        /// Directory of bottom garments; every top is paired with every bottom
        #[arg(long)]
        bottoms: Option<PathBuf>,

        /// Category applied to images found in --tops
        #[arg(long, default_value = "top")]
        category: GarmentCategory,

        #[command(flatten)]
        subject: SubjectArgs,

        #[command(flatten)]
        config: ConfigArgs,

        /// Drop images that fail fidelity scoring against the garments
        #[arg(long)]
        fidelity: bool,
    },

    /// Score a generated image against its source garment
    Score {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        generated: PathBuf,

        /// Write a difference heatmap to this path
        #[arg(long)]
        heatmap: Option<PathBuf>,
    },

    /// Probe provider availability
    Status {
        /// Only this provider; all configured providers when omitted
        #[arg(long)]
        provider: Option<ProviderKind>,
    },

    /// Estimate the cost of a request
    Cost {
        #[arg(long, default_value = "openai")]
        provider: ProviderKind,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RequestArgs {
    #[arg(long, default_value = "openai")]
    pub provider: ProviderKind,

    /// Garment image as PATH or CATEGORY=PATH; repeatable
    #[arg(long = "garment", value_parser = parse_garment)]
    pub garments: Vec<GarmentRef>,

    #[command(flatten)]
    pub subject: SubjectArgs,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Drop images that fail fidelity scoring against the garments
    #[arg(long)]
    pub fidelity: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SubjectArgs {
    #[arg(long)]
    pub gender: Option<String>,

    #[arg(long)]
    pub age_range: Option<String>,

    #[arg(long)]
    pub ethnicity: Option<String>,

    #[arg(long)]
    pub body_type: Option<String>,

    #[arg(long)]
    pub height: Option<String>,

    #[arg(long)]
    pub pose: Option<String>,

    #[arg(long)]
    pub background: Option<String>,

    /// Free-text details appended to the prompt
    #[arg(long)]
    pub description: Option<String>,

    /// Person photo used by try-on providers
    #[arg(long)]
    pub person: Option<PathBuf>,
}

impl SubjectArgs {
    /// Defaults overridden by every flag that was given
    pub fn to_subject(&self) -> SubjectAttributes {
        let mut subject = SubjectAttributes::default();
        let overrides = [
            (&mut subject.gender, &self.gender),
            (&mut subject.age_range, &self.age_range),
            (&mut subject.ethnicity, &self.ethnicity),
            (&mut subject.body_type, &self.body_type),
            (&mut subject.height, &self.height),
            (&mut subject.pose, &self.pose),
            (&mut subject.background, &self.background),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
        subject.custom_description = self.description.clone();
        subject.reference_person = self.person.clone();
        subject
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ConfigArgs {
    /// Images per request (1-4)
    #[arg(long, default_value_t = 1)]
    pub count: u8,

    #[arg(long, default_value = "1024x1024")]
    pub resolution: Resolution,

    #[arg(long, default_value = "standard")]
    pub quality: QualityTier,

    #[arg(long)]
    pub seed: Option<i64>,
}

impl ConfigArgs {
    pub fn to_config(&self) -> SharedResult<OutputConfig> {
        Ok(OutputConfig {
            count: OutputCount::new(self.count)?,
            resolution: self.resolution,
            quality: self.quality,
            seed: self.seed,
        })
    }
}

/// `PATH` (treated as a top) or `CATEGORY=PATH`
pub fn parse_garment(value: &str) -> Result<GarmentRef, String> {
    let (category, path) = match value.split_once('=') {
        Some((category, path)) => (category.parse::<GarmentCategory>().map_err(|e| e.to_string())?, path),
        None => (GarmentCategory::Top, value),
    };
    GarmentRef::new(path, category).map_err(|e| e.to_string())
}
