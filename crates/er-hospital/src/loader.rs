//! CSV hospital snapshots.
//!
//! # CSV format
//!
//! ```csv
//! id,name,lat,lon,capacity,occupancy,specialties,trauma_center,emergency_services,current_wait_time
//! 1,Manipal Hospital Whitefield,12.9698,77.7500,200,0,cardiology;neurology;trauma,true,true,20
//! ```
//!
//! `specialties` is `;`-separated and case-insensitive.  `occupancy` may be
//! left empty (0).

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use er_core::{GeoPoint, HospitalId};

use crate::hospital::Hospital;
use crate::{HospitalError, HospitalResult};

/// Where hospital records come from at startup and on refresh.
pub trait HospitalDataSource: Send + Sync {
    fn load(&self) -> HospitalResult<Vec<Hospital>>;
}

/// Records held in memory.
#[derive(Clone, Debug, Default)]
pub struct StaticHospitals(pub Vec<Hospital>);

impl HospitalDataSource for StaticHospitals {
    fn load(&self) -> HospitalResult<Vec<Hospital>> {
        Ok(self.0.clone())
    }
}

/// Reads the CSV at `path` on every `load`.
#[derive(Clone, Debug)]
pub struct CsvHospitalSource {
    path: PathBuf,
}

impl CsvHospitalSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HospitalDataSource for CsvHospitalSource {
    fn load(&self) -> HospitalResult<Vec<Hospital>> {
        load_hospitals_csv(&self.path)
    }
}

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct HospitalRecord {
    id:                 u32,
    name:               String,
    lat:                f64,
    lon:                f64,
    capacity:           u32,
    #[serde(default)]
    occupancy:          Option<u32>,
    specialties:        String,
    trauma_center:      bool,
    emergency_services: bool,
    current_wait_time:  f64,
}

impl HospitalRecord {
    fn into_hospital(self) -> Hospital {
        Hospital::new(HospitalId(self.id), self.name, GeoPoint::new(self.lat, self.lon), self.capacity)
            .with_specialties(self.specialties.split(';'))
            .with_occupancy(self.occupancy.unwrap_or(0))
            .with_trauma_center(self.trauma_center)
            .with_emergency_services(self.emergency_services)
            .with_wait_time(self.current_wait_time)
    }

    fn from_hospital(h: &Hospital) -> Self {
        Self {
            id:                 h.id.0,
            name:               h.name.clone(),
            lat:                h.location.lat,
            lon:                h.location.lon,
            capacity:           h.capacity,
            occupancy:          Some(h.occupancy),
            specialties:        h.specialties.iter().map(String::as_str).collect::<Vec<_>>().join(";"),
            trauma_center:      h.trauma_center,
            emergency_services: h.emergency_services,
            current_wait_time:  h.current_wait_time,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

pub fn load_hospitals_csv(path: &Path) -> HospitalResult<Vec<Hospital>> {
    let file = File::open(path)?;
    load_hospitals_reader(file)
}

/// Like [`load_hospitals_csv`] but accepts any `Read` source.  Each record
/// is validated.
pub fn load_hospitals_reader<R: Read>(reader: R) -> HospitalResult<Vec<Hospital>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut hospitals = Vec::new();
    for (line, result) in csv_reader.deserialize::<HospitalRecord>().enumerate() {
        let record = result.map_err(|e| HospitalError::Parse(format!("record {}: {e}", line + 1)))?;
        let hospital = record.into_hospital();
        hospital.validate()?;
        hospitals.push(hospital);
    }
    Ok(hospitals)
}

pub fn write_hospitals_csv<W: Write>(writer: W, hospitals: &[Hospital]) -> HospitalResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    for h in hospitals {
        out.serialize(HospitalRecord::from_hospital(h))
            .map_err(|e| HospitalError::Parse(e.to_string()))?;
    }
    out.flush()?;
    Ok(())
}
