//! Emergency classification enums shared across the workspace.
//!
//! Codes are parsed case-insensitively at the boundary; anything else is an
//! [`CoreError::UnknownCondition`] / [`CoreError::UnknownPriority`] and the
//! request never reaches the dispatcher.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

// ── Condition ─────────────────────────────────────────────────────────────────

/// Patient condition reported by the caller.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Cardiac,
    Stroke,
    Trauma,
    Respiratory,
    Pediatric,
    #[default]
    General,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Cardiac,
        Condition::Stroke,
        Condition::Trauma,
        Condition::Respiratory,
        Condition::Pediatric,
        Condition::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Cardiac     => "cardiac",
            Condition::Stroke      => "stroke",
            Condition::Trauma      => "trauma",
            Condition::Respiratory => "respiratory",
            Condition::Pediatric   => "pediatric",
            Condition::General     => "general",
        }
    }

    /// Specialties that satisfy this condition, lowercase.
    pub fn required_specialties(self) -> &'static [&'static str] {
        match self {
            Condition::Cardiac     => &["cardiology", "cardiac surgery"],
            Condition::Stroke      => &["neurology", "neurosurgery"],
            Condition::Trauma      => &["trauma"],
            Condition::Respiratory => &["pulmonology", "general medicine", "emergency medicine"],
            Condition::Pediatric   => &["pediatrics"],
            Condition::General     => &["emergency medicine", "general medicine", "surgery"],
        }
    }

    /// Only trauma cases require a designated trauma center.
    pub fn requires_trauma_center(self) -> bool {
        matches!(self, Condition::Trauma)
    }

    /// Conditions where minutes change outcomes; trauma centers get a bonus.
    pub fn is_time_critical(self) -> bool {
        matches!(self, Condition::Cardiac | Condition::Stroke | Condition::Trauma)
    }
}

impl FromStr for Condition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == code)
            .ok_or_else(|| CoreError::UnknownCondition(s.to_string()))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Priority ──────────────────────────────────────────────────────────────────

/// Dispatch priority assigned by the call taker.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    #[default]
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] =
        [Priority::Critical, Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High     => "high",
            Priority::Medium   => "medium",
            Priority::Low      => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == code)
            .ok_or_else(|| CoreError::UnknownPriority(s.to_string()))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── VehicleClass ──────────────────────────────────────────────────────────────

/// Class of vehicle making the trip.  Determines how much faster than
/// ambient traffic the vehicle can move.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    #[default]
    Ambulance,
    /// Ordinary traffic; speed factor 1.
    Civilian,
}

impl VehicleClass {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleClass::Ambulance => "ambulance",
            VehicleClass::Civilian  => "civilian",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
