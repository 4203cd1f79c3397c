//! `er-spatial` — road network, spatial snapping, and route search.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`network`] | `RoadNetwork` (CSR + R-tree), `RoadNetworkBuilder`, `RoadClass` |
//! | [`grid`]    | `GridSpec`, synthetic `RoadNetwork::build(bounds, spec)`        |
//! | [`router`]  | `Router` trait, `MultiObjectiveRouter`, `RouteCandidate`        |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                              |

pub mod error;
pub mod grid;
pub mod network;
pub mod router;

#[cfg(test)]
mod tests;

pub use error::{SpatialError, SpatialResult};
pub use grid::GridSpec;
pub use network::{RoadClass, RoadNetwork, RoadNetworkBuilder};
pub use router::{
    BaseTravelTime, EdgeCost, MultiObjectiveRouter, RouteCandidate, Router, SearchObjective,
    shortest_path,
};
