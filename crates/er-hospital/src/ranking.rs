//! Suitability scoring.
//!
//! ```text
//! score = w_specialty * specialty + w_distance * distance
//!       + w_wait * wait + w_capacity * capacity
//! ```
//!
//! Every component lies in `[0, 1]`:
//!
//! | Component   | Value                                                   |
//! |-------------|---------------------------------------------------------|
//! | `specialty` | see [`specialty_match`]                                 |
//! | `distance`  | `1 / (1 + km / half)`, `half` = 5 km, 3.5 km rush hour  |
//! | `wait`      | `1 / (1 + minutes / 30)`                                |
//! | `capacity`  | `min(free_beds / 300, 1)`                               |
//!
//! Hospitals without emergency services are never ranked.  Output is sorted
//! by score descending, then by lower hospital id, so identical inputs give
//! identical order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use er_core::{Condition, ContextualInfo, GeoPoint};

use crate::hospital::Hospital;

const DISTANCE_HALF_KM: f64 = 5.0;
const DISTANCE_HALF_KM_RUSH: f64 = 3.5;
const WAIT_HALF_MIN: f64 = 30.0;
const CAPACITY_FULL_BEDS: f64 = 300.0;

/// Fixed, documented weighting policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityWeights {
    pub specialty: f64,
    pub distance: f64,
    pub wait: f64,
    pub capacity: f64,
}

impl Default for SuitabilityWeights {
    fn default() -> Self {
        Self { specialty: 0.40, distance: 0.30, wait: 0.20, capacity: 0.10 }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub specialty: f64,
    pub distance: f64,
    pub wait: f64,
    pub capacity: f64,
}

impl ScoreBreakdown {
    pub fn weighted(&self, w: &SuitabilityWeights) -> f64 {
        w.specialty * self.specialty
            + w.distance * self.distance
            + w.wait * self.wait
            + w.capacity * self.capacity
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedHospital {
    pub hospital: Hospital,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Straight-line distance from the emergency.
    pub distance_km: f64,
}

/// Graded specialty match.
///
/// - Trauma at a hospital without a trauma center: 0.
/// - A required specialty present (for trauma, the trauma center itself
///   counts): 0.9, plus 0.1 unless the condition is time-critical and the
///   hospital has no trauma center.
/// - Otherwise, emergency services only: 0.3.
pub fn specialty_match(hospital: &Hospital, condition: Condition) -> f64 {
    if condition.requires_trauma_center() && !hospital.trauma_center {
        return 0.0;
    }
    let exact = condition.required_specialties().iter().any(|s| hospital.has_specialty(s))
        || (condition.requires_trauma_center() && hospital.trauma_center);
    if exact {
        if condition.is_time_critical() && !hospital.trauma_center { 0.9 } else { 1.0 }
    } else if hospital.emergency_services {
        0.3
    } else {
        0.0
    }
}

pub fn score_hospital(
    hospital: &Hospital,
    location: GeoPoint,
    condition: Condition,
    context: &ContextualInfo,
    weights: &SuitabilityWeights,
) -> RankedHospital {
    let distance_km = location.distance_km(hospital.location);
    let half = if context.is_rush_hour { DISTANCE_HALF_KM_RUSH } else { DISTANCE_HALF_KM };
    let breakdown = ScoreBreakdown {
        specialty: specialty_match(hospital, condition),
        distance: 1.0 / (1.0 + distance_km / half),
        wait: 1.0 / (1.0 + hospital.current_wait_time.max(0.0) / WAIT_HALF_MIN),
        capacity: (hospital.free_beds() as f64 / CAPACITY_FULL_BEDS).min(1.0),
    };
    RankedHospital {
        hospital: hospital.clone(),
        score: breakdown.weighted(weights),
        breakdown,
        distance_km,
    }
}

/// Rank every emergency-capable hospital for this call.
pub fn rank_hospitals(
    hospitals: &[Hospital],
    location: GeoPoint,
    condition: Condition,
    context: &ContextualInfo,
    weights: &SuitabilityWeights,
) -> Vec<RankedHospital> {
    let mut ranked: Vec<RankedHospital> = hospitals
        .iter()
        .filter(|h| h.emergency_services)
        .map(|h| score_hospital(h, location, condition, context, weights))
        .collect();
    ranked.sort_by(compare_ranked);
    ranked
}

fn compare_ranked(a: &RankedHospital, b: &RankedHospital) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.hospital.id.cmp(&b.hospital.id))
}

/// Nearest hospital by straight-line distance, preferring those with
/// emergency services.  Ties go to the lower id.
pub fn nearest_hospital(hospitals: &[Hospital], location: GeoPoint) -> Option<(&Hospital, f64)> {
    let pick = |emergency_only: bool| {
        hospitals
            .iter()
            .filter(|h| !emergency_only || h.emergency_services)
            .map(|h| (h, location.distance_km(h.location)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)))
    };
    pick(true).or_else(|| pick(false))
}
