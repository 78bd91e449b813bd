//! Common test utilities for provider integration tests

pub mod fixtures;

pub use fixtures::*;
