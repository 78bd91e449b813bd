//! Common test utilities for orchestrator integration tests

pub mod fakes;
pub mod fixtures;

pub use fakes::*;
pub use fixtures::*;
