//! Forecasting error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `er-traffic`.
#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("no model variant has been trained")]
    ModelNotTrained,

    #[error("no model artifact at {0}")]
    ModelNotFound(PathBuf),

    #[error("model artifact format {found} is not supported (expected {expected})")]
    IncompatibleArtifact { expected: u32, found: u32 },

    #[error("training failed: {0}")]
    Training(String),

    #[error("{what}: expected {expected} rows, got {got}")]
    ShapeMismatch {
        what:     &'static str,
        expected: usize,
        got:      usize,
    },

    #[error("invalid feature {field}: {value}")]
    InvalidFeature { field: &'static str, value: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TrafficResult<T> = Result<T, TrafficError>;
