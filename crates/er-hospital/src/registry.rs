//! `HospitalRegistry` — the published hospital set.
//!
//! Every change (full reload or a single wait-time refresh) builds a new
//! `Vec<Hospital>` and publishes it through a [`Snapshot`], so a ranking in
//! flight keeps reading the version it started with.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};

use er_core::{Condition, ContextualInfo, GeoPoint, HospitalId, Snapshot, Versioned};

use crate::hospital::Hospital;
use crate::loader::HospitalDataSource;
use crate::ranking::{RankedHospital, SuitabilityWeights, nearest_hospital, rank_hospitals};
use crate::{HospitalError, HospitalResult};

#[derive(Debug, Default)]
pub struct HospitalRegistry {
    hospitals: Snapshot<Vec<Hospital>>,
    weights: SuitabilityWeights,
}

impl HospitalRegistry {
    pub fn new(weights: SuitabilityWeights) -> Self {
        Self { hospitals: Snapshot::default(), weights }
    }

    pub fn weights(&self) -> &SuitabilityWeights {
        &self.weights
    }

    /// Validate and publish `hospitals` as the new registry contents.
    /// Nothing is published if any record is invalid or an id repeats.
    pub fn load(&self, mut hospitals: Vec<Hospital>) -> HospitalResult<u64> {
        let mut seen = HashSet::with_capacity(hospitals.len());
        for h in &hospitals {
            h.validate()?;
            if !seen.insert(h.id) {
                return Err(HospitalError::DuplicateId(h.id));
            }
        }
        hospitals.sort_by_key(|h| h.id);
        let count = hospitals.len();
        let version = self.hospitals.publish(hospitals);
        info!("hospital registry v{version}: {count} hospitals");
        Ok(version)
    }

    pub fn refresh(&self, source: &dyn HospitalDataSource) -> HospitalResult<u64> {
        self.load(source.load()?)
    }

    pub fn current(&self) -> Arc<Versioned<Vec<Hospital>>> {
        self.hospitals.current()
    }

    pub fn version(&self) -> u64 {
        self.hospitals.version()
    }

    pub fn len(&self) -> usize {
        self.hospitals.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: HospitalId) -> Option<Hospital> {
        self.hospitals.current().iter().find(|h| h.id == id).cloned()
    }

    /// Replace one hospital's wait time.  Identity and every other field are
    /// unchanged.
    pub fn update_wait_time(&self, id: HospitalId, minutes: f64) -> HospitalResult<u64> {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(HospitalError::InvalidRecord(format!(
                "{id}: wait time {minutes} must be a non-negative number of minutes"
            )));
        }
        let version = self.hospitals.publish_with(|current| {
            let mut next = current.clone();
            let slot = next
                .iter_mut()
                .find(|h| h.id == id)
                .ok_or(HospitalError::UnknownHospital(id))?;
            slot.current_wait_time = minutes;
            Ok::<_, HospitalError>(next)
        })?;
        debug!("{id} wait time now {minutes:.1} min (registry v{version})");
        Ok(version)
    }

    /// Rank the current snapshot.  See [`crate::ranking`].
    pub fn rank(
        &self,
        location: GeoPoint,
        condition: Condition,
        context: &ContextualInfo,
    ) -> Vec<RankedHospital> {
        rank_hospitals(&self.hospitals.current(), location, condition, context, &self.weights)
    }

    /// See [`nearest_hospital`].
    pub fn nearest(&self, location: GeoPoint) -> Option<(Hospital, f64)> {
        nearest_hospital(&self.hospitals.current(), location).map(|(h, km)| (h.clone(), km))
    }
}
