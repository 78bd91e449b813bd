//! Provider adapters for the generation orchestration core
//!
//! Each backend sits behind the [`ProviderAdapter`] trait. Job-based
//! backends are driven by the [`AsyncPoller`] over a [`JobBackend`].

pub mod adapters;
pub mod client;
pub mod error;
pub mod http;
pub mod job;
pub mod poller;
pub mod registry;
pub mod traits;

// Re-export main types
pub use adapters::{FashnTryonAdapter, ImagenAdapter, OpenAiAdapter, StabilityAdapter};
pub use client::JobApiClient;
pub use error::{ProviderError, ProviderResult};
pub use job::{JobPayload, JobStatus, JobStatusResponse, ProviderJob};
pub use poller::{AsyncPoller, CompletedJob};
pub use registry::{build_adapter, build_adapter_with_prompts, build_adapter_with_timeout, ProviderKind};
pub use traits::*;
