//! Fixed-schema feature vector.
//!
//! # Schema
//!
//! Models see exactly [`NUM_FEATURES`] values in the order of
//! [`FEATURE_NAMES`].  The six cyclic encodings at the end are derived from
//! `hour`, `day_of_week` and `month` during [`FeatureVector::to_row`] and
//! cannot be set independently.
//!
//! # Neutral defaults
//!
//! | Field                      | Default |
//! |----------------------------|---------|
//! | `temperature`              | 25 °C   |
//! | `humidity`                 | 60 %    |
//! | `pressure`                 | 1013    |
//! | `visibility`               | 10 km   |
//! | `wind_speed`               | 3 m/s   |
//! | `historical_traffic_ratio` | 1.0     |
//! | `month`                    | 1       |
//! | everything else            | 0       |
//!
//! The calendar flags stay unset by default; [`FeatureVector::set_calendar`]
//! fills them from a [`ContextualInfo`].

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use er_core::{ContextSnapshot, ContextualInfo, IncidentKind, WeatherSnapshot};

use crate::{TrafficError, TrafficResult};

pub const NUM_FEATURES: usize = 30;

pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "hour", "day_of_week", "month",
    "temperature", "humidity", "pressure", "visibility", "wind_speed",
    "is_raining", "is_snowing", "rain_intensity", "temp_trend", "rain_forecast_6h",
    "is_weekend", "is_rush_hour", "is_night", "is_holiday", "is_school_time",
    "distance_km", "duration_normal_min", "historical_traffic_ratio",
    "num_accidents", "num_construction", "major_incident_nearby",
    "sin_hour", "cos_hour", "sin_day", "cos_day", "sin_month", "cos_month",
];

/// Columns that are standard-scaled before reaching a model.
pub const NUMERICAL_FEATURES: [usize; 9] = [3, 4, 5, 6, 7, 10, 11, 18, 19];

/// One sample in the fixed feature schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureVector {
    pub hour: f64,
    pub day_of_week: u8,
    pub month: u8,

    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub visibility: f64,
    pub wind_speed: f64,
    pub is_raining: bool,
    pub is_snowing: bool,
    pub rain_intensity: f64,
    pub temp_trend: f64,
    pub rain_forecast_6h: bool,

    pub is_weekend: bool,
    pub is_rush_hour: bool,
    pub is_night: bool,
    pub is_holiday: bool,
    pub is_school_time: bool,

    pub distance_km: f64,
    pub duration_normal_min: f64,
    pub historical_traffic_ratio: f64,

    pub num_accidents: u32,
    pub num_construction: u32,
    pub major_incident_nearby: bool,
}

impl Default for FeatureVector {
    fn default() -> Self {
        let mut fv = Self {
            hour: 0.0,
            day_of_week: 0,
            month: 1,
            temperature: 0.0,
            humidity: 0.0,
            pressure: 0.0,
            visibility: 0.0,
            wind_speed: 0.0,
            is_raining: false,
            is_snowing: false,
            rain_intensity: 0.0,
            temp_trend: 0.0,
            rain_forecast_6h: false,
            is_weekend: false,
            is_rush_hour: false,
            is_night: false,
            is_holiday: false,
            is_school_time: false,
            distance_km: 0.0,
            duration_normal_min: 0.0,
            historical_traffic_ratio: 1.0,
            num_accidents: 0,
            num_construction: 0,
            major_incident_nearby: false,
        };
        fv.set_weather(&WeatherSnapshot::default());
        fv
    }
}

impl FeatureVector {
    /// Build from a context snapshot.  The first traffic leg supplies the
    /// route fields; without one they stay at their defaults.
    pub fn from_context(ctx: &ContextSnapshot) -> Self {
        let mut fv = Self::default();
        fv.set_weather(&ctx.weather);
        fv.set_calendar(&ctx.contextual);

        if let Some(leg) = ctx.traffic_legs.first() {
            fv.distance_km = leg.distance_km;
            fv.duration_normal_min = leg.duration_normal_min;
            fv.historical_traffic_ratio = leg.traffic_ratio();
        }

        fv.num_accidents = ctx.count_incidents(IncidentKind::Accident) as u32;
        fv.num_construction = ctx.count_incidents(IncidentKind::Construction) as u32;
        fv.major_incident_nearby = ctx.has_major_incident();
        fv
    }

    /// Same conditions on a specific route.
    pub fn with_route(mut self, distance_km: f64, duration_normal_min: f64) -> Self {
        self.distance_km = distance_km;
        self.duration_normal_min = duration_normal_min;
        self
    }

    pub fn set_weather(&mut self, w: &WeatherSnapshot) {
        self.temperature = w.temperature;
        self.humidity = w.humidity;
        self.pressure = w.pressure;
        self.visibility = w.visibility;
        self.wind_speed = w.wind_speed;
        self.is_raining = w.is_raining;
        self.is_snowing = w.is_snowing;
        self.rain_intensity = w.rain_intensity;
        self.temp_trend = w.temp_trend;
        self.rain_forecast_6h = w.rain_forecast_6h;
    }

    pub fn set_calendar(&mut self, c: &ContextualInfo) {
        self.hour = c.hour;
        self.day_of_week = c.day_of_week;
        self.month = c.month;
        self.is_weekend = c.is_weekend;
        self.is_rush_hour = c.is_rush_hour;
        self.is_night = c.is_night;
        self.is_holiday = c.is_holiday;
        self.is_school_time = c.is_school_time;
    }

    pub fn calendar(&self) -> ContextualInfo {
        ContextualInfo::from_parts(self.hour, self.day_of_week, self.month, self.is_holiday)
    }

    /// The same sample `minutes` into the future: time-of-day fields (and
    /// the calendar flags that depend on them) advance, everything else is
    /// held constant.
    pub fn shifted_by(&self, minutes: f64) -> Self {
        let mut fv = self.clone();
        fv.set_calendar(&self.calendar().advanced_by(minutes));
        fv
    }

    /// Reject non-finite or out-of-range values.
    pub fn validate(&self) -> TrafficResult<()> {
        let checks: [(&'static str, f64, bool); 9] = [
            ("hour", self.hour, (0.0..24.0).contains(&self.hour)),
            ("day_of_week", self.day_of_week as f64, self.day_of_week < 7),
            ("month", self.month as f64, (1..=12).contains(&self.month)),
            ("humidity", self.humidity, self.humidity >= 0.0),
            ("visibility", self.visibility, self.visibility >= 0.0),
            ("rain_intensity", self.rain_intensity, self.rain_intensity >= 0.0),
            ("distance_km", self.distance_km, self.distance_km >= 0.0),
            ("duration_normal_min", self.duration_normal_min, self.duration_normal_min >= 0.0),
            ("historical_traffic_ratio", self.historical_traffic_ratio, self.historical_traffic_ratio >= 0.0),
        ];
        if let Some(&(field, value, _)) = checks.iter().find(|check| !check.2) {
            return Err(TrafficError::InvalidFeature { field, value });
        }
        let row = self.to_row();
        if let Some(i) = row.iter().position(|v| !v.is_finite()) {
            return Err(TrafficError::InvalidFeature { field: FEATURE_NAMES[i], value: row[i] });
        }
        Ok(())
    }

    /// Encode in schema order, deriving the cyclic fields.
    pub fn to_row(&self) -> [f64; NUM_FEATURES] {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let hour = TAU * self.hour / 24.0;
        let day = TAU * self.day_of_week as f64 / 7.0;
        let month = TAU * self.month as f64 / 12.0;
        [
            self.hour,
            self.day_of_week as f64,
            self.month as f64,
            self.temperature,
            self.humidity,
            self.pressure,
            self.visibility,
            self.wind_speed,
            flag(self.is_raining),
            flag(self.is_snowing),
            self.rain_intensity,
            self.temp_trend,
            flag(self.rain_forecast_6h),
            flag(self.is_weekend),
            flag(self.is_rush_hour),
            flag(self.is_night),
            flag(self.is_holiday),
            flag(self.is_school_time),
            self.distance_km,
            self.duration_normal_min,
            self.historical_traffic_ratio,
            self.num_accidents as f64,
            self.num_construction as f64,
            flag(self.major_incident_nearby),
            hour.sin(),
            hour.cos(),
            day.sin(),
            day.cos(),
            month.sin(),
            month.cos(),
        ]
    }
}
