//! Core types used throughout the generation core

pub mod request;
pub mod result;

pub use request::*;
pub use result::*;
