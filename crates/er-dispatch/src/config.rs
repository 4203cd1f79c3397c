//! Dispatch policy.
//!
//! Every field has a documented default; a JSON file only needs the fields
//! it overrides.
//!
//! | Field                    | Default          |
//! |--------------------------|------------------|
//! | `top_n`                  | 3                |
//! | `routes_per_hospital`    | 3                |
//! | `alternatives`           | 2                |
//! | `candidate_timeout_ms`   | 2000             |
//! | `context_timeout_ms`     | 1500             |
//! | `horizons`               | 15, 30, 45, 60   |
//! | `ambulance_speed_factor` | 1.3              |
//! | `critical_speed_factor`  | 1.45             |
//! | `min_travel_minutes`     | 0.5              |
//! | `uncertainty_scale`      | 1.0              |
//! | `fallback_speed_kmh`     | 30               |

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use er_hospital::SuitabilityWeights;
use er_traffic::SpeedPolicy;

use crate::{DispatchError, DispatchResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Ranked hospitals that get a full route search.
    pub top_n: usize,
    pub routes_per_hospital: usize,
    /// Alternatives listed next to the winner.
    pub alternatives: usize,
    pub candidate_timeout_ms: u64,
    pub context_timeout_ms: u64,
    pub horizons: Vec<u32>,
    pub ambulance_speed_factor: f64,
    pub critical_speed_factor: f64,
    pub min_travel_minutes: f64,
    pub uncertainty_scale: f64,
    /// Straight-line speed for no-route estimates and the fallback.
    pub fallback_speed_kmh: f64,
    pub weights: SuitabilityWeights,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let speed = SpeedPolicy::default();
        Self {
            top_n: 3,
            routes_per_hospital: 3,
            alternatives: 2,
            candidate_timeout_ms: 2_000,
            context_timeout_ms: 1_500,
            horizons: vec![15, 30, 45, 60],
            ambulance_speed_factor: speed.ambulance_speed_factor,
            critical_speed_factor: speed.critical_speed_factor,
            min_travel_minutes: speed.min_travel_minutes,
            uncertainty_scale: speed.uncertainty_scale,
            fallback_speed_kmh: 30.0,
            weights: SuitabilityWeights::default(),
        }
    }
}

impl DispatchConfig {
    pub fn from_json_path(path: &Path) -> DispatchResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DispatchResult<()> {
        let fail = |msg: &str| Err(DispatchError::Config(msg.to_string()));
        if self.top_n == 0 {
            return fail("top_n must be at least 1");
        }
        if self.routes_per_hospital == 0 {
            return fail("routes_per_hospital must be at least 1");
        }
        if self.candidate_timeout_ms == 0 || self.context_timeout_ms == 0 {
            return fail("timeouts must be positive");
        }
        let positive = [
            self.ambulance_speed_factor,
            self.critical_speed_factor,
            self.uncertainty_scale,
            self.fallback_speed_kmh,
        ];
        if positive.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return fail("speed factors, uncertainty scale and fallback speed must be positive");
        }
        if !self.min_travel_minutes.is_finite() || self.min_travel_minutes <= 0.0 {
            return fail("min_travel_minutes must be positive");
        }
        Ok(())
    }

    pub fn candidate_timeout(&self) -> Duration {
        Duration::from_millis(self.candidate_timeout_ms)
    }

    pub fn context_timeout(&self) -> Duration {
        Duration::from_millis(self.context_timeout_ms)
    }

    pub fn speed_policy(&self) -> SpeedPolicy {
        SpeedPolicy {
            ambulance_speed_factor: self.ambulance_speed_factor,
            critical_speed_factor: self.critical_speed_factor,
            min_travel_minutes: self.min_travel_minutes,
            uncertainty_scale: self.uncertainty_scale,
        }
    }

    /// Straight-line travel estimate in minutes, floored like predictions.
    pub fn straight_line_minutes(&self, km: f64) -> f64 {
        (km / self.fallback_speed_kmh * 60.0).max(self.min_travel_minutes)
    }
}
