//! Incoming emergency calls and boundary validation.

use serde::{Deserialize, Serialize};

use er_core::{CityBounds, Condition, CoreError, CoreResult, GeoPoint, Priority};

/// A call as received from the transport layer.  Codes are raw strings so
/// an unknown value can be rejected here, before dispatch starts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyRequest {
    pub call_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Defaults to `general` when absent.
    pub condition: Option<String>,
    /// Defaults to `high` when absent.
    pub priority: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

impl EmergencyRequest {
    pub fn new(location: GeoPoint, condition: Condition, priority: Priority) -> Self {
        Self {
            latitude: location.lat,
            longitude: location.lon,
            condition: Some(condition.as_str().to_string()),
            priority: Some(priority.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Parse codes and check the location against `bounds` (with its snap
    /// tolerance).
    pub fn validate(&self, bounds: &CityBounds) -> CoreResult<ValidatedRequest> {
        let location = self.location();
        if !location.is_valid() {
            return Err(CoreError::InvalidInput(format!(
                "coordinates ({}, {}) are not a valid location",
                self.latitude, self.longitude
            )));
        }
        if !bounds.contains_with_tolerance(location) {
            return Err(CoreError::OutOfBounds { point: location });
        }
        let condition = match self.condition.as_deref() {
            Some(code) => code.parse()?,
            None => Condition::default(),
        };
        let priority = match self.priority.as_deref() {
            Some(code) => code.parse()?,
            None => Priority::default(),
        };
        Ok(ValidatedRequest {
            call_id: self.call_id.clone(),
            location,
            patient: PatientInfo {
                condition,
                priority,
                age: self.age,
                gender: self.gender.clone(),
                address: self.address.clone(),
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub condition: Condition,
    pub priority: Priority,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

/// A request that passed boundary validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRequest {
    pub call_id: Option<String>,
    pub location: GeoPoint,
    pub patient: PatientInfo,
}
