use thiserror::Error;

pub type Result<T, E = GlimpseError> = std::result::Result<T, E>;

/// Unified error type covering the failure classes of the capture pipeline.
///
/// Only `Configuration` is ever surfaced to a caller of the public API;
/// the remaining variants are isolated to the tick or flush that produced them.
#[derive(Debug, Error)]
pub enum GlimpseError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("capture error: {0}")]
    Capture(String),
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("diagnostic write error: {0}")]
    DiagnosticWrite(String),
    #[error("pipeline error: {0}")]
    Pipeline(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
