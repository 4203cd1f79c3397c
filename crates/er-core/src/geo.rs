//! Geographic coordinate type and city bounds.
//!
//! `GeoPoint` uses `f64` latitude/longitude.  Travel-time arithmetic
//! downstream is done in `f64` minutes, so keeping coordinates at the same
//! precision avoids conversions on the hot path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Mean Earth radius, metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `true` if both components are finite and inside the WGS-84 ranges.
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    #[inline]
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        self.distance_m(other) / 1_000.0
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── CityBounds ────────────────────────────────────────────────────────────────

/// Axis-aligned lat/lon rectangle describing the serviceable region.
///
/// The default is the Bengaluru service area.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityBounds {
    pub north: f64,
    pub south: f64,
    pub east:  f64,
    pub west:  f64,
    /// How far outside the rectangle (in degrees) a point may lie and still
    /// be snapped to the network.
    pub tolerance_deg: f64,
}

impl Default for CityBounds {
    fn default() -> Self {
        Self {
            north: 13.1986,
            south: 12.7340,
            east:  77.8431,
            west:  77.3910,
            tolerance_deg: 0.05,
        }
    }
}

impl CityBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self { north, south, east, west, ..Self::default() }
    }

    /// Smallest bounds enclosing `points`, or `None` for an empty iterator.
    pub fn enclosing(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut b = Self {
            north: first.lat,
            south: first.lat,
            east:  first.lon,
            west:  first.lon,
            ..Self::default()
        };
        for p in it {
            b.north = b.north.max(p.lat);
            b.south = b.south.min(p.lat);
            b.east = b.east.max(p.lon);
            b.west = b.west.min(p.lon);
        }
        Some(b)
    }

    /// Reject non-finite or zero-area bounds.
    pub fn validate(&self) -> CoreResult<()> {
        let finite = [self.north, self.south, self.east, self.west, self.tolerance_deg]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CoreError::InvalidInput("bounds contain non-finite values".into()));
        }
        if self.north <= self.south || self.east <= self.west {
            return Err(CoreError::InvalidInput(format!(
                "degenerate bounds: north {} south {} east {} west {}",
                self.north, self.south, self.east, self.west
            )));
        }
        if self.tolerance_deg < 0.0 {
            return Err(CoreError::InvalidInput("negative bounds tolerance".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn contains(&self, p: GeoPoint) -> bool {
        self.contains_with_margin(p, 0.0)
    }

    /// Containment check after growing the rectangle by `self.tolerance_deg`.
    #[inline]
    pub fn contains_with_tolerance(&self, p: GeoPoint) -> bool {
        self.contains_with_margin(p, self.tolerance_deg)
    }

    fn contains_with_margin(&self, p: GeoPoint, margin: f64) -> bool {
        p.lat <= self.north + margin
            && p.lat >= self.south - margin
            && p.lon <= self.east + margin
            && p.lon >= self.west - margin
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Bounds around a pair of points grown by `margin_deg` on every side.
    /// Used to scope incident lookups to an origin/destination corridor.
    pub fn around(a: GeoPoint, b: GeoPoint, margin_deg: f64) -> Self {
        Self {
            north: a.lat.max(b.lat) + margin_deg,
            south: a.lat.min(b.lat) - margin_deg,
            east:  a.lon.max(b.lon) + margin_deg,
            west:  a.lon.min(b.lon) - margin_deg,
            tolerance_deg: 0.0,
        }
    }
}
