//! Shared types for the generation orchestration core
//!
//! Contains the request/result data model, validation errors, and the
//! collaborator contracts (progress sink, credentials, prompt builder)
//! used by the provider adapters and the orchestrator.

pub mod cancel;
pub mod config;
pub mod errors;
pub mod logging;
pub mod progress;
pub mod prompt;
pub mod types;

pub use cancel::CancellationToken;
pub use config::{CredentialSource, EnvCredentials, MockCredentialSource, Settings, StaticCredentials};
pub use errors::*;
pub use progress::{ChannelSink, ProgressEvent, ProgressReporter, ProgressSink};
pub use prompt::{FaithfulPromptBuilder, PromptBuilder, PromptPair};
pub use types::*;
