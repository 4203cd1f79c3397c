//! `er-hospital` — hospital records and suitability ranking.
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`hospital`] | `Hospital`                                                 |
//! | [`ranking`]  | `SuitabilityWeights`, `rank_hospitals`, `specialty_match`  |
//! | [`registry`] | `HospitalRegistry` (atomic snapshot, wait-time refresh)    |
//! | [`loader`]   | `HospitalDataSource`, CSV reader/writer                    |
//! | [`error`]    | `HospitalError`, `HospitalResult<T>`                       |

pub mod error;
pub mod hospital;
pub mod loader;
pub mod ranking;
pub mod registry;

#[cfg(test)]
mod tests;

pub use error::{HospitalError, HospitalResult};
pub use hospital::Hospital;
pub use loader::{
    CsvHospitalSource, HospitalDataSource, StaticHospitals, load_hospitals_csv,
    load_hospitals_reader, write_hospitals_csv,
};
pub use ranking::{
    RankedHospital, ScoreBreakdown, SuitabilityWeights, nearest_hospital, rank_hospitals,
    score_hospital, specialty_match,
};
pub use registry::HospitalRegistry;
