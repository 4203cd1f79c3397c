//! Context snapshot: the externally supplied weather, traffic, incident and
//! calendar features for one origin/destination pair at one moment.
//!
//! Every part has a documented neutral default so a snapshot is always
//! complete, even when upstream sources fail.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::GeoPoint;

// ── Weather ───────────────────────────────────────────────────────────────────

/// Current weather near the origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSnapshot {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Percent.
    pub humidity: f64,
    /// hPa.
    pub pressure: f64,
    /// Kilometres.
    pub visibility: f64,
    /// m/s.
    pub wind_speed: f64,
    pub condition_label: String,
    pub is_raining: bool,
    pub is_snowing: bool,
    /// mm over the last hour.
    pub rain_intensity: f64,
    /// Mean temperature change per forecast step.
    pub temp_trend: f64,
    pub rain_forecast_6h: bool,
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 60.0,
            pressure: 1013.0,
            visibility: 10.0,
            wind_speed: 3.0,
            condition_label: "Clear".to_string(),
            is_raining: false,
            is_snowing: false,
            rain_intensity: 0.0,
            temp_trend: 0.0,
            rain_forecast_6h: false,
        }
    }
}

// ── Traffic ───────────────────────────────────────────────────────────────────

/// One live-traffic route leg reported by a traffic service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficLeg {
    pub distance_km: f64,
    pub duration_normal_min: f64,
    pub duration_traffic_min: f64,
}

impl TrafficLeg {
    /// Ratio of in-traffic to free-flow duration; 1.0 when unknown.
    pub fn traffic_ratio(&self) -> f64 {
        if self.duration_normal_min > 0.0 && self.duration_traffic_min > 0.0 {
            self.duration_traffic_min / self.duration_normal_min
        } else {
            1.0
        }
    }
}

// ── Incidents ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Accident,
    Construction,
    Closure,
    Other,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Minor,
    Moderate,
    Major,
}

/// A road incident inside the origin/destination corridor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub kind: IncidentKind,
    pub severity: IncidentSeverity,
    pub location: GeoPoint,
    /// Expected remaining duration, minutes.
    pub estimated_duration_min: f64,
}

// ── Calendar context ──────────────────────────────────────────────────────────

/// Time-of-day and calendar features.
///
/// Flags are always derived from `hour`/`day_of_week` by
/// [`ContextualInfo::from_parts`] so they never disagree with each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextualInfo {
    /// Fractional hour of day in `[0, 24)`.
    pub hour: f64,
    /// Monday = 0 … Sunday = 6.
    pub day_of_week: u8,
    /// 1 … 12.
    pub month: u8,
    pub is_weekend: bool,
    pub is_rush_hour: bool,
    pub is_night: bool,
    pub is_holiday: bool,
    pub is_school_time: bool,
}

impl Default for ContextualInfo {
    /// Monday noon in January, not a holiday.
    fn default() -> Self {
        Self::from_parts(12.0, 0, 1, false)
    }
}

impl ContextualInfo {
    /// Derive all flags from the raw calendar fields.
    ///
    /// Rush hour is 07–10 and 17–20 inclusive, night is 22–06, school time is
    /// weekday 07–17 outside holidays.
    pub fn from_parts(hour: f64, day_of_week: u8, month: u8, is_holiday: bool) -> Self {
        let hour = hour.rem_euclid(24.0);
        let day_of_week = day_of_week % 7;
        let h = hour.floor() as u32;

        let is_weekend = day_of_week >= 5;
        let is_rush_hour = (7..=10).contains(&h) || (17..=20).contains(&h);
        let is_night = h >= 22 || h <= 6;
        let is_school_time = !is_weekend && !is_holiday && (7..=17).contains(&h);

        Self {
            hour,
            day_of_week,
            month: month.clamp(1, 12),
            is_weekend,
            is_rush_hour,
            is_night,
            is_holiday,
            is_school_time,
        }
    }

    pub fn from_datetime(at: NaiveDateTime, is_holiday: bool) -> Self {
        let hour = at.hour() as f64 + at.minute() as f64 / 60.0;
        let dow = at.weekday().num_days_from_monday() as u8;
        Self::from_parts(hour, dow, at.month() as u8, is_holiday)
    }

    /// The same calendar context `minutes` later.  Day of week rolls over at
    /// midnight; month and holiday flag are held constant.
    pub fn advanced_by(&self, minutes: f64) -> Self {
        let total = self.hour + minutes / 60.0;
        let days = total.div_euclid(24.0) as i64;
        let dow = (self.day_of_week as i64 + days).rem_euclid(7) as u8;
        Self::from_parts(total, dow, self.month, self.is_holiday)
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Everything known about current conditions for one request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub weather: WeatherSnapshot,
    pub traffic_legs: Vec<TrafficLeg>,
    pub contextual: ContextualInfo,
    pub incidents: Vec<Incident>,
}

impl ContextSnapshot {
    pub fn count_incidents(&self, kind: IncidentKind) -> usize {
        self.incidents.iter().filter(|i| i.kind == kind).count()
    }

    pub fn has_major_incident(&self) -> bool {
        self.incidents
            .iter()
            .any(|i| i.severity == IncidentSeverity::Major)
    }

    /// "Heavy" during rush hour, "Moderate" otherwise.
    pub fn traffic_level(&self) -> &'static str {
        if self.contextual.is_rush_hour { "Heavy" } else { "Moderate" }
    }
}
