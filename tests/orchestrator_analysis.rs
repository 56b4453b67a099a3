//! Orchestrator Analysis Tests
//!
//! Strategic views assembled by `HpcOrchestrator`, and the shared
//! single-writer wrapper used by the replay binary.

use race_twin::clock::ManualClock;
use race_twin::strategic::{RacePhase, RecommendationKind, StrategicComplexity};
use race_twin::telemetry::parse_frame;
use race_twin::types::{CarSnapshot, TelemetryFrame, ThreatLevel, TireSnapshot, TrackConditions, TrackStatus};
use race_twin::{HpcOrchestrator, RaceConfig, RiskLevel, SharedTwin};
use std::sync::Arc;

fn car(id: &str, position: u32, tire_age: u32) -> CarSnapshot {
    CarSnapshot {
        car_id: id.to_string(),
        team: Some(format!("Team {id}")),
        driver: Some(format!("Driver {id}")),
        position: Some(position),
        tire: TireSnapshot {
            age: Some(tire_age),
            wear_level: Some(0.3),
            ..Default::default()
        },
        fuel_level: Some(0.7),
        lap_time: Some(84.0 + f64::from(position) * 0.25),
        ..Default::default()
    }
}

fn frame(lap: u32, status: TrackStatus, cars: Vec<CarSnapshot>) -> TelemetryFrame {
    TelemetryFrame {
        lap: Some(lap),
        track_conditions: TrackConditions {
            track_status: Some(status),
            ..Default::default()
        },
        cars,
        ..Default::default()
    }
}

/// Our car in P4 with fresh-tired rivals directly around it
fn create_sample_frame(lap: u32, status: TrackStatus) -> TelemetryFrame {
    frame(
        lap,
        status,
        vec![
            car("1", 1, 20),
            car("16", 3, 2),
            car("44", 4, 12),
            car("55", 5, 3),
            car("63", 12, 12),
        ],
    )
}

fn orchestrator() -> HpcOrchestrator {
    HpcOrchestrator::new(&RaceConfig::default(), Arc::new(ManualClock::at_epoch()))
}

#[test]
fn fresh_tired_neighbours_raise_risk() {
    let mut orch = orchestrator();
    orch.update_field_twin(&create_sample_frame(10, TrackStatus::Green)).unwrap();
    let analysis = orch.strategic_analysis();

    let twin = orch.field_twin();
    assert_eq!(twin.get_competitor("16").unwrap().threat_level(), ThreatLevel::High);
    assert_eq!(twin.get_competitor("55").unwrap().threat_level(), ThreatLevel::High);
    assert_eq!(twin.get_competitor("63").unwrap().threat_level(), ThreatLevel::Low);

    let threats = &analysis.threat_assessment;
    assert_eq!(threats.immediate_threats.len(), 2);
    assert_eq!(threats.overall_risk_level, RiskLevel::High);

    let defensive = analysis
        .recommendations
        .iter()
        .find(|r| r.kind == RecommendationKind::Defensive)
        .expect("defensive recommendation");
    assert_eq!(defensive.reasoning, "Multiple threats detected (2 immediate)");

    assert_eq!(analysis.competitor_summary.total_competitors, 4);
    assert!(analysis
        .race_situation
        .key_factors
        .contains(&"multiple_strategic_threats".to_string()));
}

#[test]
fn race_situation_tracks_phase_and_status() {
    let mut orch = orchestrator();
    orch.update_field_twin(&create_sample_frame(10, TrackStatus::Green)).unwrap();
    assert_eq!(orch.strategic_analysis().race_situation.race_phase, RacePhase::Opening);

    orch.update_field_twin(&create_sample_frame(25, TrackStatus::SafetyCar)).unwrap();
    let situation = orch.strategic_analysis().race_situation;
    assert_eq!(situation.race_phase, RacePhase::Middle);
    assert!(situation.key_factors.contains(&"track_status_safety_car".to_string()));
    // Safety-car opportunity plus two high threats
    assert_eq!(situation.strategic_complexity, StrategicComplexity::High);

    orch.update_field_twin(&create_sample_frame(40, TrackStatus::Green)).unwrap();
    assert_eq!(orch.strategic_analysis().race_situation.race_phase, RacePhase::Closing);
}

#[test]
fn analysis_is_stable_between_updates() {
    let mut orch = orchestrator();
    orch.update_field_twin(&create_sample_frame(10, TrackStatus::Green)).unwrap();
    assert_eq!(orch.strategic_analysis(), orch.strategic_analysis());
}

#[test]
fn competitor_behavior_prediction() {
    let mut orch = orchestrator();
    for lap in 1..=3 {
        orch.update_field_twin(&create_sample_frame(lap, TrackStatus::Green)).unwrap();
    }
    assert!(orch.predict_competitor_behavior("22", 300).is_none());

    let p = orch.predict_competitor_behavior("1", 900).unwrap();
    assert_eq!(p.strategic_context.current_threat_level, ThreatLevel::Medium);
    assert!((p.confidence_factors.data_quality - 0.3).abs() < 1e-9);
    assert_eq!(p.prediction.strategic_behavior.undercut_likelihood.len(), 9);
}

#[test]
fn strategic_analysis_serializes() {
    let mut orch = orchestrator();
    orch.update_field_twin(&create_sample_frame(10, TrackStatus::SafetyCar)).unwrap();
    let json = serde_json::to_value(orch.strategic_analysis()).unwrap();
    assert_eq!(json["threat_assessment"]["overall_risk_level"], "high");
    assert_eq!(json["race_situation"]["race_phase"], "opening");
    assert_eq!(json["competitor_summary"]["threat_levels"]["high"], 2);
}

// ============================================================================
// Shared wrapper
// ============================================================================

#[tokio::test]
async fn shared_twin_serves_snapshots_across_tasks() {
    let twin = Arc::new(SharedTwin::new(orchestrator()));

    let writer = {
        let twin = Arc::clone(&twin);
        tokio::spawn(async move {
            for lap in 1..=20 {
                twin.ingest(&create_sample_frame(lap, TrackStatus::Green)).unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let reader = {
        let twin = Arc::clone(&twin);
        tokio::spawn(async move {
            let mut last_lap = 0;
            for _ in 0..50 {
                let lap = twin.snapshot().state.race_context.current_lap;
                assert!(lap >= last_lap, "snapshots went backwards");
                last_lap = lap;
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    let snap = twin.snapshot();
    assert_eq!(snap.state.race_context.current_lap, 20);
    assert_eq!(snap.performance.total_updates, 20);
    assert_eq!(twin.predict(300).future_laps, 3);
}

#[tokio::test]
async fn shared_twin_ingests_parsed_lines() {
    let twin = SharedTwin::new(orchestrator());
    let lines = [
        r#"{"lap": 1, "cars": [{"car_id": "44", "position": 2}, {"car_id": "1", "position": 1}]}"#,
        r#"{"lap": 2}"#,
        r#"{"lap": 3, "cars": [{"car_id": "1", "position": 1}]}"#,
        r#"{"lap": 4, "cars": [{"car_id": "44", "position": 1}, {"car_id": "1", "position": 2}]}"#,
    ];

    let mut accepted = 0;
    for line in lines {
        if let Ok(frame) = parse_frame(line) {
            if twin.ingest(&frame).is_ok() {
                accepted += 1;
            }
        }
    }

    assert_eq!(accepted, 2);
    let snap = twin.snapshot();
    assert_eq!(snap.state.race_context.current_lap, 4);
    assert_eq!(snap.state.race_context.our_position, 1);
    assert_eq!(snap.state.metrics.frames_rejected, 1);
}
