//! Response types handed back to the transport layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use er_core::{ContextSnapshot, GeoPoint, HospitalId};
use er_hospital::Hospital;

use crate::request::PatientInfo;

// ── Status & state machine ────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Optimized,
    Fallback,
}

/// Per-request lifecycle.
///
/// ```text
/// Received → ContextReady → HospitalsRanked → RoutesGenerated → Predicted → Recommended
///     └──────────────┴──────────────┴───────────────┴──────────────┴──→ Failed → Fallback
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Received,
    ContextReady,
    HospitalsRanked,
    RoutesGenerated,
    Predicted,
    Recommended,
    Failed,
    Fallback,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Recommended | RequestState::Fallback)
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        match (self, next) {
            (Received, ContextReady)
            | (ContextReady, HospitalsRanked)
            | (HospitalsRanked, RoutesGenerated)
            | (RoutesGenerated, Predicted)
            | (Predicted, Recommended)
            | (Failed, Fallback) => true,
            (from, Failed) => !from.is_terminal() && from != Failed,
            _ => false,
        }
    }
}

// ── Degradations ──────────────────────────────────────────────────────────────

/// Something that went wrong but was recovered from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// An upstream context provider failed or timed out; defaults were used.
    DataUnavailable { provider: String, reason: String },
    /// No road route to this hospital; a straight-line estimate was used.
    NoRouteFound { hospital: HospitalId },
    /// No trained model; travel time equals base duration.
    ModelNotTrained,
    /// Prediction failed for another reason; base duration was used.
    PredictionFailed { hospital: HospitalId, reason: String },
    /// The candidate ran out of time, possibly after scoring some routes.
    CandidateTimeout { hospital: HospitalId },
    CandidateFailed { hospital: HospitalId, reason: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::DataUnavailable { provider, reason } => {
                write!(f, "{provider} data unavailable ({reason})")
            }
            Degradation::NoRouteFound { hospital } => write!(f, "no route to {hospital}"),
            Degradation::ModelNotTrained => f.write_str("traffic model not trained"),
            Degradation::PredictionFailed { hospital, reason } => {
                write!(f, "prediction for {hospital} failed ({reason})")
            }
            Degradation::CandidateTimeout { hospital } => write!(f, "{hospital} timed out"),
            Degradation::CandidateFailed { hospital, reason } => {
                write!(f, "{hospital} failed ({reason})")
            }
        }
    }
}

// ── Building blocks ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HospitalSummary {
    pub id: HospitalId,
    pub name: String,
    pub location: GeoPoint,
    pub specialties: Vec<String>,
    pub trauma_center: bool,
    pub current_wait_time: f64,
}

impl From<&Hospital> for HospitalSummary {
    fn from(h: &Hospital) -> Self {
        Self {
            id: h.id,
            name: h.name.clone(),
            location: h.location,
            specialties: h.specialties.iter().cloned().collect(),
            trauma_center: h.trauma_center,
            current_wait_time: h.current_wait_time,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Search objective that produced the route.
    pub algorithm: String,
    pub coordinates: Vec<GeoPoint>,
    pub distance_km: f64,
    pub estimated_time_min: f64,
    pub normal_travel_time_min: f64,
    pub time_saved_min: f64,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlternativeOption {
    pub hospital_id: HospitalId,
    pub hospital_name: String,
    pub travel_time_min: f64,
    pub total_time_min: f64,
    /// Suitability rank, 1-based.
    pub rank: usize,
    /// `true` when the travel time is a straight-line estimate.
    pub estimated: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionsSummary {
    pub weather: String,
    pub traffic_level: String,
    pub incidents: usize,
    pub temperature: f64,
}

impl From<&ContextSnapshot> for ConditionsSummary {
    fn from(ctx: &ContextSnapshot) -> Self {
        Self {
            weather: ctx.weather.condition_label.clone(),
            traffic_level: ctx.traffic_level().to_string(),
            incidents: ctx.incidents.len(),
            temperature: ctx.weather.temperature,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub processing_time_ms: f64,
    pub confidence_score: f64,
    /// `time_saved / normal_travel_time`; 0 when the latter is 0.
    pub route_efficiency: f64,
}

// ── Recommendations ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecommendation {
    pub status: DispatchStatus,
    pub call_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub emergency_location: GeoPoint,
    pub patient: PatientInfo,
    pub recommended_hospital: HospitalSummary,
    pub optimal_route: RouteSummary,
    pub alternatives: Vec<AlternativeOption>,
    pub current_conditions: ConditionsSummary,
    /// Minutes from now until arrival.
    pub eta_minutes: f64,
    pub eta: DateTime<Utc>,
    pub performance: PerformanceMetrics,
    pub degradations: Vec<Degradation>,
    pub states: Vec<RequestState>,
}

impl DispatchRecommendation {
    /// Whether any part of the decision ran on substituted data.
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallbackRecommendation {
    pub status: DispatchStatus,
    pub call_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub emergency_location: GeoPoint,
    pub patient: PatientInfo,
    pub message: String,
    pub recommendation: String,
    /// Nearest hospital by straight line, if any hospital is loaded.
    pub nearest_hospital: Option<HospitalSummary>,
    pub straight_line_km: Option<f64>,
    pub estimated_time_min: Option<f64>,
    pub degradations: Vec<Degradation>,
    pub states: Vec<RequestState>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DispatchResponse {
    Optimized(DispatchRecommendation),
    Fallback(FallbackRecommendation),
}

impl DispatchResponse {
    pub fn status(&self) -> DispatchStatus {
        match self {
            DispatchResponse::Optimized(_) => DispatchStatus::Optimized,
            DispatchResponse::Fallback(_) => DispatchStatus::Fallback,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match self {
            DispatchResponse::Optimized(r) => r.call_id.as_deref(),
            DispatchResponse::Fallback(r) => r.call_id.as_deref(),
        }
    }

    pub fn patient(&self) -> &PatientInfo {
        match self {
            DispatchResponse::Optimized(r) => &r.patient,
            DispatchResponse::Fallback(r) => &r.patient,
        }
    }

    pub fn hospital_id(&self) -> Option<HospitalId> {
        match self {
            DispatchResponse::Optimized(r) => Some(r.recommended_hospital.id),
            DispatchResponse::Fallback(r) => r.nearest_hospital.as_ref().map(|h| h.id),
        }
    }

    /// Optimized travel time, or the fallback's straight-line estimate.
    pub fn estimated_time_min(&self) -> Option<f64> {
        match self {
            DispatchResponse::Optimized(r) => Some(r.optimal_route.estimated_time_min),
            DispatchResponse::Fallback(r) => r.estimated_time_min,
        }
    }

    pub fn degradations(&self) -> &[Degradation] {
        match self {
            DispatchResponse::Optimized(r) => &r.degradations,
            DispatchResponse::Fallback(r) => &r.degradations,
        }
    }

    pub fn states(&self) -> &[RequestState] {
        match self {
            DispatchResponse::Optimized(r) => &r.states,
            DispatchResponse::Fallback(r) => &r.states,
        }
    }

    pub fn as_optimized(&self) -> Option<&DispatchRecommendation> {
        match self {
            DispatchResponse::Optimized(r) => Some(r),
            DispatchResponse::Fallback(_) => None,
        }
    }
}
