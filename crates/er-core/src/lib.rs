//! `er-core` — foundational types for the emergency routing workspace.
//!
//! This crate is a dependency of every other `er-*` crate.  It has no `er-*`
//! dependencies of its own.
//!
//! # What lives here
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`ids`]       | `NodeId`, `EdgeId`, `HospitalId`                         |
//! | [`geo`]       | `GeoPoint`, `CityBounds`, haversine distance             |
//! | [`emergency`] | `Condition`, `Priority`, `VehicleClass`                  |
//! | [`context`]   | `ContextSnapshot` and its weather/traffic/incident parts |
//! | [`snapshot`]  | `Snapshot<T>`: versioned, atomically swapped `Arc<T>`   |
//! | [`rng`]       | `SeededRng` for reproducible training and simulation     |
//! | [`error`]     | `CoreError`, `CoreResult`                                |

pub mod context;
pub mod emergency;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod snapshot;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use context::{
    ContextSnapshot, ContextualInfo, Incident, IncidentKind, IncidentSeverity, TrafficLeg,
    WeatherSnapshot,
};
pub use emergency::{Condition, Priority, VehicleClass};
pub use error::{CoreError, CoreResult};
pub use geo::{CityBounds, GeoPoint};
pub use ids::{EdgeId, HospitalId, NodeId};
pub use rng::SeededRng;
pub use snapshot::{Snapshot, Versioned};
