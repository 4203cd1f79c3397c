//! The `Hospital` record.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use er_core::{GeoPoint, HospitalId};

use crate::{HospitalError, HospitalResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: HospitalId,
    pub name: String,
    pub location: GeoPoint,
    /// Bed capacity, always `> 0`.
    pub capacity: u32,
    /// Beds currently in use.
    #[serde(default)]
    pub occupancy: u32,
    /// Lower-case specialty names.
    pub specialties: BTreeSet<String>,
    pub trauma_center: bool,
    pub emergency_services: bool,
    /// Minutes, `>= 0`.  Refreshed externally.
    pub current_wait_time: f64,
}

impl Hospital {
    pub fn new(id: HospitalId, name: impl Into<String>, location: GeoPoint, capacity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            capacity,
            occupancy: 0,
            specialties: BTreeSet::new(),
            trauma_center: false,
            emergency_services: true,
            current_wait_time: 0.0,
        }
    }

    pub fn with_specialties<I, S>(mut self, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.specialties = specialties
            .into_iter()
            .map(|s| normalize_specialty(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn with_trauma_center(mut self, trauma_center: bool) -> Self {
        self.trauma_center = trauma_center;
        self
    }

    pub fn with_emergency_services(mut self, emergency_services: bool) -> Self {
        self.emergency_services = emergency_services;
        self
    }

    pub fn with_wait_time(mut self, minutes: f64) -> Self {
        self.current_wait_time = minutes;
        self
    }

    pub fn with_occupancy(mut self, occupancy: u32) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialties.contains(specialty)
    }

    pub fn free_beds(&self) -> u32 {
        self.capacity.saturating_sub(self.occupancy)
    }

    pub fn validate(&self) -> HospitalResult<()> {
        let fail = |why: &str| Err(HospitalError::InvalidRecord(format!("{}: {why}", self.id)));
        if self.id == HospitalId::INVALID {
            return fail("reserved id");
        }
        if !self.location.is_valid() {
            return fail("location is not a valid coordinate");
        }
        if self.capacity == 0 {
            return fail("capacity must be positive");
        }
        if !self.current_wait_time.is_finite() || self.current_wait_time < 0.0 {
            return fail("wait time must be a non-negative number of minutes");
        }
        Ok(())
    }
}

pub(crate) fn normalize_specialty(s: &str) -> String {
    s.trim().to_lowercase()
}
