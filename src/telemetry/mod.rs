//! Telemetry Normalization Boundary
//!
//! Turns one JSON telemetry line into a `TelemetryFrame`. This is the only
//! place a frame can be rejected: the twin itself tolerates missing sub-fields,
//! but a frame must at least be an object carrying a `cars` array.
//!
//! Input lines look like:
//!
//! ```json
//! {"timestamp": "2024-05-26T13:04:00Z", "lap": 12, "session_type": "race",
//!  "track_conditions": {"temperature": 31.5, "weather": "sunny", "track_status": "green"},
//!  "cars": [{"car_id": "44", "position": 3, "tire": {"compound": "medium", "age": 12}}]}
//! ```

use crate::types::TelemetryFrame;
use thiserror::Error;

/// Frame rejected before reaching the twin
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Telemetry frame is empty")]
    Empty,

    #[error("Telemetry frame is not a JSON object")]
    NotAnObject,

    #[error("Telemetry frame has no 'cars' array")]
    MissingCars,

    #[error("Malformed telemetry frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse and validate one telemetry JSON document.
pub fn parse_frame(line: &str) -> Result<TelemetryFrame, ValidationError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    validate_value(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Structural checks on an already-decoded JSON value.
pub fn validate_value(value: &serde_json::Value) -> Result<(), ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;
    match obj.get("cars") {
        Some(serde_json::Value::Array(_)) => Ok(()),
        _ => Err(ValidationError::MissingCars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TireCompound, TrackStatus};

    const FULL_FRAME: &str = r#"{
        "timestamp": "2024-05-26T13:04:00Z",
        "lap": 12,
        "session_type": "race",
        "track_conditions": {"temperature": 31.5, "weather": "sunny", "track_status": "safety_car"},
        "cars": [
            {"car_id": "44", "team": "Mercedes", "driver": "Hamilton", "position": 3,
             "speed": 287.5, "tire": {"compound": "hard", "age": 12, "wear_level": 0.35},
             "fuel_level": 0.62, "lap_time": 83.1, "sector_times": [27.1, 28.4, 27.6]}
        ]
    }"#;

    #[test]
    fn parses_complete_frame() {
        let frame = parse_frame(FULL_FRAME).expect("valid frame");
        assert_eq!(frame.lap, Some(12));
        assert_eq!(frame.track_conditions.track_status, Some(TrackStatus::SafetyCar));
        let car = frame.find_car("44").expect("car 44");
        assert_eq!(car.position, Some(3));
        assert_eq!(car.tire.compound, Some(TireCompound::Hard));
        assert_eq!(car.tire.age, Some(12));
        assert_eq!(car.sector_times, Some([27.1, 28.4, 27.6]));
    }

    #[test]
    fn partial_car_fields_are_tolerated() {
        let frame = parse_frame(r#"{"cars": [{"car_id": "33"}]}"#).expect("minimal frame");
        assert_eq!(frame.lap, None);
        assert_eq!(frame.cars.len(), 1);
        assert_eq!(frame.cars[0].tire.age, None);
    }

    #[test]
    fn rejects_missing_cars() {
        let err = parse_frame(r#"{"lap": 3}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingCars), "got {err:?}");
    }

    #[test]
    fn rejects_cars_that_are_not_an_array() {
        let err = parse_frame(r#"{"cars": {"44": {}}}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingCars), "got {err:?}");
    }

    #[test]
    fn rejects_non_object() {
        let err = parse_frame("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject), "got {err:?}");
    }

    #[test]
    fn rejects_garbage_and_blank_lines() {
        assert!(matches!(parse_frame("{not json"), Err(ValidationError::Malformed(_))));
        assert!(matches!(parse_frame("   "), Err(ValidationError::Empty)));
    }

    #[test]
    fn rejects_unknown_track_status() {
        let err = parse_frame(
            r#"{"track_conditions": {"track_status": "chequered"}, "cars": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)), "got {err:?}");
    }
}
