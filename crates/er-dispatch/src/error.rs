use std::time::Duration;

use thiserror::Error;

use er_core::CoreError;
use er_hospital::HospitalError;
use er_spatial::SpatialError;
use er_traffic::TrafficError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{provider} data unavailable: {reason}")]
    DataUnavailable { provider: &'static str, reason: String },

    #[error("{what} timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },

    #[error("every candidate hospital failed")]
    AllCandidatesFailed,

    #[error("dispatch configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Traffic(#[from] TrafficError),

    #[error(transparent)]
    Hospital(#[from] HospitalError),

    #[error("dispatch log error: {0}")]
    Log(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
