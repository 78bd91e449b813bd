//! Shared error types for the generation core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SharedError {
    #[error("Output count must be between 1 and 4, got {count}")]
    InvalidCount { count: u8 },

    #[error("Garment image not found: {path}")]
    MissingImage { path: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
