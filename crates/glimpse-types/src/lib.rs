//! Shared domain types for the Glimpse capture pipeline.

pub mod config;
pub mod frame;
pub mod mask;

mod errors;

pub use errors::{GlimpseError, Result};
