//! Rater bias detection.
//!
//! Every check compares evaluations of the same subject against each other,
//! so a rater is only suspected when their view of someone departs sharply
//! from everyone else's.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{group_by_subject, SubjectGroup};
use crate::models::{
    AlertKind, AlertSummary, BiasAlert, EvaluationRecord, RaterRole, Severity,
};

/// Percentage-point thresholds for each check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasThresholds {
    /// Gap to the other evaluations that flags a record.
    pub gap: f64,
    /// Gap above which a low outlier becomes high severity.
    pub severe_gap: f64,
    /// Combined score under which a lone evaluation is flagged.
    pub low_score: f64,
    /// Combined score under which a lone evaluation is high severity.
    pub severe_low_score: f64,
    /// Per-axis difference between self and manager evaluations.
    pub discrepancy: f64,
    pub manager_low: f64,
    pub manager_severe_low: f64,
    pub manager_high: f64,
}

impl Default for BiasThresholds {
    fn default() -> Self {
        Self {
            gap: 30.0,
            severe_gap: 40.0,
            low_score: 50.0,
            severe_low_score: 30.0,
            discrepancy: 30.0,
            manager_low: 40.0,
            manager_severe_low: 30.0,
            manager_high: 95.0,
        }
    }
}

pub fn compute_bias_alerts(records: &[EvaluationRecord]) -> Vec<BiasAlert> {
    detect_with(records, &BiasThresholds::default())
}

pub fn detect_with(records: &[EvaluationRecord], thresholds: &BiasThresholds) -> Vec<BiasAlert> {
    let mut alerts = Vec::new();
    for group in group_by_subject(records) {
        detect_for_subject(&group, thresholds, &mut alerts);
    }
    alerts
}

fn detect_for_subject(
    group: &SubjectGroup<'_>,
    thresholds: &BiasThresholds,
    alerts: &mut Vec<BiasAlert>,
) {
    let records = &group.records;
    let mut flagged: HashSet<Uuid> = HashSet::new();

    if records.len() >= 2 {
        let combined: Vec<f64> = records.iter().map(|r| r.combined_score()).collect();

        for (index, record) in records.iter().enumerate() {
            let own = combined[index];
            let others: Vec<f64> = combined
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, score)| *score)
                .collect();
            let others_mean = others.iter().sum::<f64>() / others.len() as f64;
            let gap = others_mean - own;

            if gap > thresholds.gap {
                flagged.insert(record.id);
                let others_floor = others.iter().copied().fold(f64::INFINITY, f64::min);

                alerts.push(BiasAlert {
                    subject: group.subject.to_string(),
                    record_id: Some(record.id),
                    kind: AlertKind::BiasDetected,
                    severity: if gap > thresholds.severe_gap {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    message: format!(
                        "Bias detected: {} by {} is {:.0} points below the other evaluations \
                         ({:.0}% vs an average of {:.0}%); every other evaluation is at or above {:.0}%",
                        record.rater_role.label(),
                        record.rater_name,
                        gap,
                        own,
                        others_mean,
                        others_floor
                    ),
                });
            }

            if -gap > thresholds.gap {
                flagged.insert(record.id);
                alerts.push(BiasAlert {
                    subject: group.subject.to_string(),
                    record_id: Some(record.id),
                    kind: AlertKind::PossibleFavoritism,
                    severity: Severity::Medium,
                    message: format!(
                        "Possible favoritism: {} by {} is {:.0} points above the other evaluations \
                         ({:.0}% vs an average of {:.0}%)",
                        record.rater_role.label(),
                        record.rater_name,
                        -gap,
                        own,
                        others_mean
                    ),
                });
            }
        }
    }

    if let [record] = records.as_slice() {
        let own = record.combined_score();
        if !flagged.contains(&record.id) && own < thresholds.low_score {
            alerts.push(BiasAlert {
                subject: group.subject.to_string(),
                record_id: Some(record.id),
                kind: AlertKind::LowEvaluation,
                severity: if own < thresholds.severe_low_score {
                    Severity::High
                } else {
                    Severity::Medium
                },
                message: format!(
                    "Very low evaluation ({:.0}%, technical {:.0}%, emotional {:.0}%) from {}",
                    own,
                    record.technical(),
                    record.emotional(),
                    record.rater_role.label()
                ),
            });
        }
    }

    let self_review = records
        .iter()
        .find(|r| r.rater_role == RaterRole::SelfAssessment);
    let manager_review = records.iter().find(|r| r.rater_role == RaterRole::Manager);
    if let (Some(own), Some(manager)) = (self_review, manager_review) {
        let technical_diff = (own.technical() - manager.technical()).abs();
        let emotional_diff = (own.emotional() - manager.emotional()).abs();

        if technical_diff > thresholds.discrepancy || emotional_diff > thresholds.discrepancy {
            alerts.push(BiasAlert {
                subject: group.subject.to_string(),
                record_id: Some(manager.id),
                kind: AlertKind::Discrepancy,
                severity: Severity::High,
                message: format!(
                    "Large gap between self-assessment and manager evaluation \
                     ({:.0} points technical, {:.0} points emotional)",
                    technical_diff, emotional_diff
                ),
            });
        }
    }

    let manager_scores: Vec<f64> = records
        .iter()
        .filter(|r| r.rater_role == RaterRole::Manager)
        .map(|r| r.combined_score())
        .collect();
    if !manager_scores.is_empty() {
        let manager_mean = manager_scores.iter().sum::<f64>() / manager_scores.len() as f64;

        if manager_mean < thresholds.manager_low {
            alerts.push(BiasAlert {
                subject: group.subject.to_string(),
                record_id: None,
                kind: AlertKind::ExtremeLow,
                severity: if manager_mean < thresholds.manager_severe_low {
                    Severity::High
                } else {
                    Severity::Medium
                },
                message: format!(
                    "Manager evaluations are consistently very low (average {:.0}%): \
                     possible negative bias or a need for attention",
                    manager_mean
                ),
            });
        } else if manager_mean > thresholds.manager_high {
            alerts.push(BiasAlert {
                subject: group.subject.to_string(),
                record_id: None,
                kind: AlertKind::ExtremeHigh,
                severity: Severity::Medium,
                message: format!(
                    "Manager evaluations are consistently very high (average {:.0}%): \
                     possible positive bias or favoritism",
                    manager_mean
                ),
            });
        }
    }
}

/// Alerts ordered high severity first, keeping detection order within a severity.
pub fn by_severity(alerts: &[BiasAlert]) -> Vec<&BiasAlert> {
    let mut ordered: Vec<&BiasAlert> = alerts.iter().collect();
    ordered.sort_by_key(|alert| alert.severity);
    ordered
}

pub fn summarize_alerts(alerts: &[BiasAlert]) -> AlertSummary {
    let mut by_kind: BTreeMap<&'static str, (AlertKind, usize)> = BTreeMap::new();
    for alert in alerts {
        by_kind.entry(alert.kind.label()).or_insert((alert.kind, 0)).1 += 1;
    }

    let mut by_kind: Vec<(AlertKind, usize)> = by_kind.into_values().collect();
    by_kind.sort_by(|a, b| b.1.cmp(&a.1));

    AlertSummary {
        high: alerts
            .iter()
            .filter(|alert| alert.severity == Severity::High)
            .count(),
        medium: alerts
            .iter()
            .filter(|alert| alert.severity == Severity::Medium)
            .count(),
        by_kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn evaluation(
        subject: &str,
        role: RaterRole,
        technical: f64,
        emotional: f64,
    ) -> EvaluationRecord {
        EvaluationRecord {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            rater_name: "Rita Alves".to_string(),
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
    fn low_outlier_is_flagged_against_peers() {
        let records = vec![
            evaluation("Ana", RaterRole::Peer, 85.0, 85.0),
            evaluation("Ana", RaterRole::Peer, 82.0, 82.0),
            evaluation("Ana", RaterRole::Peer, 20.0, 20.0),
        ];

        let alerts = compute_bias_alerts(&records);
        let bias: Vec<&BiasAlert> = alerts
            .iter()
            .filter(|alert| alert.kind == AlertKind::BiasDetected)
            .collect();
        assert_eq!(bias.len(), 1);
        assert_eq!(bias[0].severity, Severity::High);
        assert_eq!(bias[0].record_id, Some(records[2].id));
        assert!(bias[0].message.contains("(20% vs"));
        assert!(bias[0].message.contains("at or above 82%"));

        // 85 sits 34 points above the mean of 82 and 20; 82 sits only 29.5 above.
        let favoritism: Vec<&BiasAlert> = alerts
            .iter()
            .filter(|alert| alert.kind == AlertKind::PossibleFavoritism)
            .collect();
        assert_eq!(favoritism.len(), 1);
        assert_eq!(favoritism[0].record_id, Some(records[0].id));
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn outlier_gap_is_measured_against_the_others_mean() {
        let records = vec![
            evaluation("Ana", RaterRole::Peer, 85.0, 85.0),
            evaluation("Ana", RaterRole::Peer, 82.0, 82.0),
            evaluation("Ana", RaterRole::Peer, 20.0, 20.0),
        ];
        let others_mean = (records[0].combined_score() + records[1].combined_score()) / 2.0;
        assert_eq!(others_mean, 83.5);
        assert_eq!(others_mean - records[2].combined_score(), 63.5);
    }

    #[test]
    fn moderate_gap_is_medium_severity() {
        let records = vec![
            evaluation("Ana", RaterRole::Peer, 80.0, 80.0),
            evaluation("Ana", RaterRole::Peer, 45.0, 45.0),
        ];

        let alerts = compute_bias_alerts(&records);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::PossibleFavoritism);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(alerts[1].kind, AlertKind::BiasDetected);
        assert_eq!(alerts[1].severity, Severity::Medium);
    }

    #[test]
    fn single_low_evaluation_is_reported() {
        let records = vec![evaluation("Bruno", RaterRole::Peer, 20.0, 10.0)];

        let alerts = compute_bias_alerts(&records);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::LowEvaluation);
        assert_eq!(alerts[0].severity, Severity::High);
        assert!(alerts[0].message.contains("15%"));
    }

    #[test]
    fn single_evaluation_at_threshold_is_quiet() {
        let records = vec![evaluation("Bruno", RaterRole::Peer, 50.0, 50.0)];
        assert!(compute_bias_alerts(&records).is_empty());

        let records = vec![evaluation("Bruno", RaterRole::SelfAssessment, 40.0, 40.0)];
        let alerts = compute_bias_alerts(&records);
        assert_eq!(alerts[0].severity, Severity::Medium);
    }

    #[test]
    fn self_and_manager_disagreement_is_high_severity() {
        let records = vec![
            evaluation("Carla", RaterRole::SelfAssessment, 90.0, 70.0),
            evaluation("Carla", RaterRole::Manager, 50.0, 70.0),
        ];

        let alerts = compute_bias_alerts(&records);
        let discrepancy = alerts
            .iter()
            .find(|alert| alert.kind == AlertKind::Discrepancy)
            .expect("discrepancy alert");
        assert_eq!(discrepancy.severity, Severity::High);
        assert!(!alerts
            .iter()
            .any(|alert| alert.kind == AlertKind::BiasDetected));
    }

    #[test]
    fn manager_extremes_are_reported() {
        let records = vec![
            evaluation("Davi", RaterRole::Manager, 25.0, 25.0),
            evaluation("Davi", RaterRole::Peer, 35.0, 35.0),
            evaluation("Eva", RaterRole::Manager, 100.0, 100.0),
            evaluation("Eva", RaterRole::Peer, 90.0, 95.0),
        ];

        let alerts = compute_bias_alerts(&records);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::ExtremeLow);
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[0].subject, "Davi");
        assert_eq!(alerts[1].kind, AlertKind::ExtremeHigh);
        assert_eq!(alerts[1].severity, Severity::Medium);
    }

    #[test]
    fn gap_and_manager_checks_can_both_fire() {
        let records = vec![
            evaluation("Fabio", RaterRole::Peer, 90.0, 90.0),
            evaluation("Fabio", RaterRole::Manager, 20.0, 30.0),
        ];

        let kinds: Vec<AlertKind> = compute_bias_alerts(&records)
            .into_iter()
            .map(|alert| alert.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::PossibleFavoritism,
                AlertKind::BiasDetected,
                AlertKind::ExtremeLow
            ]
        );
    }

    fn kinds(alerts: &[BiasAlert]) -> Vec<(AlertKind, Severity)> {
        alerts.iter().map(|alert| (alert.kind, alert.severity)).collect()
    }

    #[test]
    fn lone_very_low_manager_evaluation_is_reported_twice() {
        let records = vec![evaluation("Hugo", RaterRole::Manager, 20.0, 20.0)];
        assert_eq!(
            kinds(&compute_bias_alerts(&records)),
            vec![
                (AlertKind::LowEvaluation, Severity::High),
                (AlertKind::ExtremeLow, Severity::High)
            ]
        );
    }

    #[test]
    fn gap_of_exactly_thirty_is_quiet() {
        let records = vec![
            evaluation("Iris", RaterRole::Peer, 80.0, 80.0),
            evaluation("Iris", RaterRole::Peer, 50.0, 50.0),
        ];
        assert!(compute_bias_alerts(&records).is_empty());
    }

    #[test]
    fn manager_mean_of_ninety_five_is_not_extreme() {
        let records = vec![
            evaluation("Joana", RaterRole::Manager, 95.0, 95.0),
            evaluation("Joana", RaterRole::Peer, 95.0, 95.0),
        ];
        assert!(compute_bias_alerts(&records).is_empty());
    }

    #[test]
    fn moderately_low_manager_mean_is_medium() {
        let records = vec![
            evaluation("Lucas", RaterRole::Manager, 35.0, 35.0),
            evaluation("Lucas", RaterRole::Peer, 35.0, 35.0),
        ];
        assert_eq!(
            kinds(&compute_bias_alerts(&records)),
            vec![(AlertKind::ExtremeLow, Severity::Medium)]
        );
    }

    #[test]
    fn non_finite_manager_averages_count_as_zero() {
        let records = vec![evaluation("Mara", RaterRole::Manager, f64::NAN, f64::INFINITY)];
        assert_eq!(
            kinds(&compute_bias_alerts(&records)),
            vec![
                (AlertKind::LowEvaluation, Severity::High),
                (AlertKind::ExtremeLow, Severity::High)
            ]
        );
    }

    #[test]
    fn custom_thresholds_are_honored() {
        let records = vec![
            evaluation("Gil", RaterRole::Peer, 80.0, 80.0),
            evaluation("Gil", RaterRole::Peer, 60.0, 60.0),
        ];
        assert!(compute_bias_alerts(&records).is_empty());

        let strict = BiasThresholds {
            gap: 10.0,
            ..BiasThresholds::default()
        };
        assert_eq!(detect_with(&records, &strict).len(), 2);
    }

    #[test]
    fn summary_counts_and_ordering() {
        let records = vec![
            evaluation("Ana", RaterRole::Peer, 80.0, 80.0),
            evaluation("Ana", RaterRole::Peer, 45.0, 45.0),
            evaluation("Bruno", RaterRole::Peer, 10.0, 10.0),
        ];
        let alerts = compute_bias_alerts(&records);

        let summary = summarize_alerts(&alerts);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 2);
        assert_eq!(summary.by_kind.iter().map(|(_, count)| count).sum::<usize>(), 3);

        let ordered = by_severity(&alerts);
        assert_eq!(ordered[0].kind, AlertKind::LowEvaluation);
        assert_eq!(ordered[1].kind, AlertKind::PossibleFavoritism);
    }
}
