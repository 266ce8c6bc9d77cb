//! Error types for Vorsight

use thiserror::Error;

/// Errors that can occur during computation
///
/// Missing landmarks and degenerate divisions are not errors: they degrade
/// the affected metric to a documented sentinel instead. Only faults the
/// caller must act on surface here.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse tracker frame: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unknown level: {0}")]
    UnknownLevel(u8),

    #[error("Insufficient calibration samples: {0}")]
    InsufficientSamples(String),

    #[error("No recorded frames to export")]
    ExportEmpty,

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
