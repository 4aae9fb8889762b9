use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use peopleops_evaluations::competencies::FrequencyLevel;
use peopleops_evaluations::db::CsvRow;
use peopleops_evaluations::models::{
    AlertKind, ApprovalStatus, EvaluationRecord, Quadrant, RaterRole, Severity,
};
use peopleops_evaluations::{classify_quadrant, compute_bias_alerts, compute_subject_aggregates};

fn record(subject: &str, role: RaterRole, technical: f64, emotional: f64) -> EvaluationRecord {
    EvaluationRecord {
        id: Uuid::new_v4(),
        subject: subject.to_string(),
        rater_name: "Joana Pires".to_string(),
        rater_role: role,
        technical_scores: BTreeMap::new(),
        emotional_scores: BTreeMap::new(),
        avg_technical: technical,
        avg_emotional: emotional,
        notes: None,
        created_at: Utc::now(),
    }
}

#[test]
fn mixed_team_produces_expected_alerts_and_ranking() {
    let records = vec![
        record("Ana", RaterRole::Manager, 85.0, 85.0),
        record("Ana", RaterRole::Peer, 82.0, 82.0),
        record("Ana", RaterRole::Peer, 20.0, 20.0),
        record("Bruno", RaterRole::Peer, 20.0, 10.0),
        record("Carla", RaterRole::SelfAssessment, 90.0, 70.0),
        record("Carla", RaterRole::Manager, 50.0, 60.0),
    ];

    let alerts = compute_bias_alerts(&records);

    let ana_bias: Vec<_> = alerts
        .iter()
        .filter(|alert| alert.subject == "Ana" && alert.kind == AlertKind::BiasDetected)
        .collect();
    assert_eq!(ana_bias.len(), 1);
    assert_eq!(ana_bias[0].record_id, Some(records[2].id));
    assert_eq!(ana_bias[0].severity, Severity::High);

    let bruno: Vec<_> = alerts.iter().filter(|alert| alert.subject == "Bruno").collect();
    assert_eq!(bruno.len(), 1);
    assert_eq!(bruno[0].kind, AlertKind::LowEvaluation);
    assert_eq!(bruno[0].severity, Severity::High);

    let carla: Vec<_> = alerts.iter().filter(|alert| alert.subject == "Carla").collect();
    assert_eq!(carla.len(), 1);
    assert_eq!(carla[0].kind, AlertKind::Discrepancy);
    assert_eq!(carla[0].severity, Severity::High);

    let aggregates = compute_subject_aggregates(&records);
    let order: Vec<&str> = aggregates.iter().map(|a| a.subject.as_str()).collect();
    assert_eq!(order, vec!["Carla", "Ana", "Bruno"]);
    for aggregate in &aggregates {
        assert_eq!(
            aggregate.overall_score,
            (aggregate.overall_technical + aggregate.overall_emotional) / 2.0
        );
        assert_eq!(
            aggregate.approval == ApprovalStatus::Approved,
            aggregate.overall_score >= 60.0
        );
    }
}

#[test]
fn quadrant_of_the_midpoint_is_promising() {
    let placement = classify_quadrant(50.0, 50.0);
    assert_eq!(placement.quadrant, Quadrant::Promising);
    assert_eq!(placement.action, "Retain and promote");
    assert_eq!((placement.scaled_technical, placement.scaled_emotional), (0.0, 0.0));
}

#[test]
fn demo_csv_imports_into_valid_records() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/evaluations.csv");
    let mut reader = csv::Reader::from_path(&path).expect("demo csv present");

    let records: Vec<EvaluationRecord> = reader
        .deserialize::<CsvRow>()
        .map(|row| row.expect("csv row").into_record().expect("valid row").0)
        .collect();
    assert_eq!(records.len(), 4);

    for record in &records {
        assert_eq!(record.technical_scores.len(), 17);
        assert_eq!(record.emotional_scores.len(), 13);
        assert!((0.0..=100.0).contains(&record.avg_technical));
        assert!((0.0..=100.0).contains(&record.avg_emotional));
    }
    assert_eq!(records[3].rater_role, RaterRole::Manager);
    assert_eq!(records[3].technical_scores[&1], FrequencyLevel::Sometimes);

    let alerts = compute_bias_alerts(&records);
    assert!(alerts
        .iter()
        .any(|alert| alert.subject == "Ana Souza" && alert.kind == AlertKind::BiasDetected));
    assert!(alerts
        .iter()
        .any(|alert| alert.subject == "Carla Mendes" && alert.kind == AlertKind::Discrepancy));
}
