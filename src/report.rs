use std::fmt::Write;

use crate::bias::{self, BiasThresholds};
use crate::matrix;
use crate::models::{ApprovalStatus, EvaluationRecord, Subject};

pub fn build_report(
    subject: Option<&str>,
    records: &[EvaluationRecord],
    subjects: &[Subject],
    thresholds: &BiasThresholds,
) -> String {
    let rows = matrix::build_matrix(records, subjects);
    let alerts = bias::detect_with(records, thresholds);
    let summary = bias::summarize_alerts(&alerts);

    let mut output = String::new();
    let scope_label = subject.unwrap_or("all employees");

    let _ = writeln!(output, "# 360° Evaluation Report");
    let _ = writeln!(output, "Generated for {}", scope_label);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");

    let approved = rows
        .iter()
        .filter(|row| row.aggregate.approval == ApprovalStatus::Approved)
        .count();
    let approval_rate = if rows.is_empty() {
        0.0
    } else {
        approved as f64 / rows.len() as f64 * 100.0
    };
    let _ = writeln!(
        output,
        "- {} evaluations across {} employees",
        records.len(),
        rows.len()
    );
    let _ = writeln!(
        output,
        "- {} approved ({:.1}%), {} bias alerts ({} high, {} medium)",
        approved,
        approval_rate,
        alerts.len(),
        summary.high,
        summary.medium
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Ranking");

    if rows.is_empty() {
        let _ = writeln!(output, "No evaluations recorded.");
    } else {
        for row in rows.iter() {
            let aggregate = &row.aggregate;
            let _ = writeln!(
                output,
                "- {}{}: {:.1}% ({}, {}) technical {:.1}%, emotional {:.1}% across {} evaluations",
                aggregate.subject,
                row.department
                    .as_deref()
                    .map(|department| format!(" ({department})"))
                    .unwrap_or_default(),
                aggregate.overall_score,
                aggregate.classification.label(),
                aggregate.approval.label(),
                aggregate.overall_technical,
                aggregate.overall_emotional,
                aggregate.evaluation_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Decision Matrix");

    if rows.is_empty() {
        let _ = writeln!(output, "No evaluations recorded.");
    } else {
        for (quadrant, count) in matrix::quadrant_distribution(&rows) {
            let _ = writeln!(
                output,
                "- {}: {} ({}). {}",
                quadrant.label(),
                count,
                quadrant.action(),
                quadrant.description()
            );
        }
        let _ = writeln!(output);
        for row in rows.iter() {
            let _ = writeln!(
                output,
                "- {} at ({:+.1}, {:+.1}): {}, next step {}, rehire {}, would miss {}",
                row.aggregate.subject,
                row.placement.scaled_technical,
                row.placement.scaled_emotional,
                row.placement.quadrant.label(),
                row.development_action.label(),
                row.would_rehire.label(),
                row.would_miss.label()
            );
        }
        let _ = writeln!(output);
        for share in matrix::action_distribution(&rows) {
            let _ = writeln!(
                output,
                "- {}: {} ({:.0}%)",
                share.action.label(),
                share.count,
                share.percentage
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Bias Alerts");

    if alerts.is_empty() {
        let _ = writeln!(output, "No anomalies detected.");
    } else {
        for alert in bias::by_severity(&alerts) {
            let _ = writeln!(
                output,
                "- [{}] {}: {}",
                alert.severity.label(),
                alert.subject,
                alert.message
            );
        }
    }

    let mut recent: Vec<&EvaluationRecord> = records
        .iter()
        .filter(|record| record.notes.is_some())
        .collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Notes");

    if recent.is_empty() {
        let _ = writeln!(output, "No notes recorded.");
    } else {
        for record in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {} ({}, {}): {}",
                record.subject,
                record.created_at.date_naive(),
                record.rater_role.label(),
                record.rater_name,
                record.notes.as_deref().unwrap_or_default()
            );
        }
    }

    output
}
