//! Spatial-subsystem error type.

use thiserror::Error;

use er_core::{GeoPoint, NodeId};

/// Errors produced by `er-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("cannot build road network: {0}")]
    GraphBuild(String),

    #[error("point {point} is outside the network bounds")]
    OutOfBounds { point: GeoPoint },

    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("path has no edges between consecutive nodes {0} and {1}")]
    BrokenPath(NodeId, NodeId),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
