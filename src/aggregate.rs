use std::collections::HashMap;

use crate::matrix;
use crate::models::{ApprovalStatus, Classification, EvaluationRecord, SubjectAggregate};

pub const EXCELLENT_FLOOR: f64 = 80.0;
pub const GOOD_FLOOR: f64 = 60.0;
pub const REGULAR_FLOOR: f64 = 40.0;
pub const APPROVAL_FLOOR: f64 = 60.0;

/// All evaluations of one subject, in input order.
#[derive(Debug, Clone)]
pub struct SubjectGroup<'a> {
    pub subject: &'a str,
    pub records: Vec<&'a EvaluationRecord>,
}

/// Groups records by exact subject name, keeping first-appearance order.
pub fn group_by_subject(records: &[EvaluationRecord]) -> Vec<SubjectGroup<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<SubjectGroup<'_>> = Vec::new();

    for record in records {
        let slot = *index.entry(record.subject.as_str()).or_insert_with(|| {
            groups.push(SubjectGroup {
                subject: record.subject.as_str(),
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].records.push(record);
    }

    groups
}

pub fn compute_subject_aggregates(records: &[EvaluationRecord]) -> Vec<SubjectAggregate> {
    let mut aggregates: Vec<SubjectAggregate> = group_by_subject(records)
        .iter()
        .filter_map(aggregate_group)
        .collect();

    aggregates.sort_by(|a, b| {
        b.overall_score
            .partial_cmp(&a.overall_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    aggregates
}

/// The `limit` best-scoring subjects, ranked as in `compute_subject_aggregates`.
pub fn top_subjects(records: &[EvaluationRecord], limit: usize) -> Vec<SubjectAggregate> {
    let mut aggregates = compute_subject_aggregates(records);
    aggregates.truncate(limit);
    aggregates
}

pub(crate) fn aggregate_group(group: &SubjectGroup<'_>) -> Option<SubjectAggregate> {
    if group.records.is_empty() {
        return None;
    }

    let count = group.records.len() as f64;
    let overall_technical = group.records.iter().map(|r| r.technical()).sum::<f64>() / count;
    let overall_emotional = group.records.iter().map(|r| r.emotional()).sum::<f64>() / count;
    let overall_score = (overall_technical + overall_emotional) / 2.0;

    Some(SubjectAggregate {
        subject: group.subject.to_string(),
        overall_technical,
        overall_emotional,
        overall_score,
        classification: classify(overall_score),
        approval: approval_status(overall_score),
        quadrant: matrix::classify_quadrant(overall_technical, overall_emotional).quadrant,
        evaluation_count: group.records.len(),
    })
}

pub fn classify(overall_score: f64) -> Classification {
    if overall_score >= EXCELLENT_FLOOR {
        Classification::Excellent
    } else if overall_score >= GOOD_FLOOR {
        Classification::Good
    } else if overall_score >= REGULAR_FLOOR {
        Classification::Regular
    } else {
        Classification::Poor
    }
}

pub fn approval_status(overall_score: f64) -> ApprovalStatus {
    if overall_score >= APPROVAL_FLOOR {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Disapproved
    }
}
