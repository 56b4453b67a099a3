//! Normalized telemetry frame types
//!
//! One `TelemetryFrame` arrives per race-lap update. Every sub-field except
//! `cars` is optional: the twin falls back to its previous values whenever a
//! field is missing, so partial frames degrade instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Enumerations
// ============================================================================

/// Race-control track status flag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    #[default]
    Green,
    Yellow,
    Red,
    SafetyCar,
    VirtualSafetyCar,
}

impl TrackStatus {
    /// Wire name used in telemetry and exported state
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Green => "green",
            TrackStatus::Yellow => "yellow",
            TrackStatus::Red => "red",
            TrackStatus::SafetyCar => "safety_car",
            TrackStatus::VirtualSafetyCar => "virtual_safety_car",
        }
    }

    /// Safety car or virtual safety car: racing is neutralized
    pub fn is_neutralized(&self) -> bool {
        matches!(self, TrackStatus::SafetyCar | TrackStatus::VirtualSafetyCar)
    }
}

impl std::fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type of racing session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Practice,
    Qualifying,
    #[default]
    Race,
    Sprint,
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionType::Practice => write!(f, "practice"),
            SessionType::Qualifying => write!(f, "qualifying"),
            SessionType::Race => write!(f, "race"),
            SessionType::Sprint => write!(f, "sprint"),
        }
    }
}

/// Tire compound fitted to a car
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TireCompound {
    Soft,
    #[default]
    Medium,
    Hard,
    Intermediate,
    Wet,
}

impl std::fmt::Display for TireCompound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TireCompound::Soft => write!(f, "soft"),
            TireCompound::Medium => write!(f, "medium"),
            TireCompound::Hard => write!(f, "hard"),
            TireCompound::Intermediate => write!(f, "intermediate"),
            TireCompound::Wet => write!(f, "wet"),
        }
    }
}

// ============================================================================
// Frame Structures
// ============================================================================

/// Track conditions block of a telemetry frame
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackConditions {
    /// Track temperature (°C)
    pub temperature: Option<f64>,
    /// Free-form weather label ("sunny", "rain", ...)
    pub weather: Option<String>,
    pub track_status: Option<TrackStatus>,
}

/// Tire state reported for one car
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TireSnapshot {
    pub compound: Option<TireCompound>,
    /// Laps completed on this set
    pub age: Option<u32>,
    /// Wear level in [0, 1]
    pub wear_level: Option<f64>,
}

/// Per-car telemetry snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CarSnapshot {
    /// Cars without an id are ignored by the twin
    #[serde(default)]
    pub car_id: String,
    pub team: Option<String>,
    pub driver: Option<String>,
    /// 1-based race position
    pub position: Option<u32>,
    /// Speed (km/h)
    pub speed: Option<f64>,
    #[serde(default)]
    pub tire: TireSnapshot,
    /// Fuel level in [0, 1]
    pub fuel_level: Option<f64>,
    /// Last lap time (s)
    pub lap_time: Option<f64>,
    pub sector_times: Option<[f64; 3]>,
}

impl CarSnapshot {
    /// Minimal snapshot carrying identity only
    pub fn new(car_id: &str, team: &str, driver: &str) -> Self {
        Self {
            car_id: car_id.to_string(),
            team: Some(team.to_string()),
            driver: Some(driver.to_string()),
            ..Default::default()
        }
    }
}

/// One normalized telemetry update covering every car on track
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TelemetryFrame {
    pub timestamp: Option<DateTime<Utc>>,
    pub lap: Option<u32>,
    pub session_type: Option<SessionType>,
    #[serde(default)]
    pub track_conditions: TrackConditions,
    pub cars: Vec<CarSnapshot>,
}

impl TelemetryFrame {
    /// Look up a car by id
    pub fn find_car(&self, car_id: &str) -> Option<&CarSnapshot> {
        self.cars.iter().find(|c| c.car_id == car_id)
    }

    /// First car reporting position 1, if any
    pub fn leader(&self) -> Option<&CarSnapshot> {
        self.cars.iter().find(|c| c.position == Some(1))
    }
}
