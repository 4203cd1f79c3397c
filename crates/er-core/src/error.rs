//! Boundary error type.
//!
//! `CoreError` covers malformed input detected before any routing or
//! prediction work starts.  Sub-crates keep their own error enums and wrap
//! `CoreError` as one variant where it can surface.

use thiserror::Error;

use crate::GeoPoint;

/// Errors raised while validating inputs at the system boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("point {point} lies outside the serviceable bounds")]
    OutOfBounds { point: GeoPoint },

    #[error("unknown condition code {0:?}")]
    UnknownCondition(String),

    #[error("unknown priority code {0:?}")]
    UnknownPriority(String),
}

/// Shorthand result type for `er-core`.
pub type CoreResult<T> = Result<T, CoreError>;
