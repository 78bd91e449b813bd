//! Orchestration layer for virtual try-on image generation
//!
//! [`GenerationOrchestrator`] runs a single request against one provider
//! adapter. [`MultiAngleCoordinator`] and [`BatchCoordinator`] build on it
//! through the [`GenerationRunner`] trait, [`fidelity_gate`] optionally
//! filters results by similarity to the garments, and [`output`] persists
//! results.

pub mod batch;
pub mod cli;
pub mod error;
pub mod fidelity_gate;
pub mod multi_angle;
pub mod orchestrator;
pub mod output;
pub mod pool;

// Re-export commonly used types
pub use batch::{combinations, requests_from_groups, scan_directory, BatchCoordinator, BatchOutcome, BatchSummary};
pub use error::{OrchestratorError, OrchestratorResult};
pub use fidelity_gate::{score_images, validate_fidelity, GarmentScore, ImageFidelity};
pub use multi_angle::{
    derive_angle_request, get_angles, Angle, AngleOutcome, AnglePreset, MultiAngleCoordinator, MultiAngleMetadata,
    MultiAngleResult,
};
pub use orchestrator::{GenerationOrchestrator, GenerationRunner, MockGenerationRunner};
pub use output::OutputWriter;
pub use pool::{WorkerPool, DEFAULT_POOL_WIDTH};
