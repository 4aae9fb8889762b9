//! Decision matrix: places subjects on a technical vs. emotional grid centered
//! on the 50% mark and derives the screening answers shown next to each point.

use std::collections::HashMap;

use crate::aggregate::{aggregate_group, group_by_subject};
use crate::models::{
    finite_or_zero, ActionShare, DevelopmentAction, EvaluationRecord, MatrixRow, Quadrant,
    QuadrantPlacement, ScreeningAnswer, Subject,
};

pub const AXIS_LIMIT: f64 = 5.0;
pub const REHIRE_YES_FLOOR: f64 = 70.0;
pub const REHIRE_MAYBE_FLOOR: f64 = 60.0;
pub const MISS_YES_FLOOR: f64 = 75.0;
pub const MISS_MAYBE_FLOOR: f64 = 60.0;
/// Any single evaluation below this combined score marks the subject as critically biased.
pub const CRITICAL_BIAS_CEILING: f64 = 20.0;

/// Maps a 0..=100 percentage onto the -5..=+5 axis.
pub fn scale_axis(percent: f64) -> f64 {
    let value = (finite_or_zero(percent) / 100.0) * 10.0 - AXIS_LIMIT;
    value.clamp(-AXIS_LIMIT, AXIS_LIMIT)
}

pub fn classify_quadrant(overall_technical: f64, overall_emotional: f64) -> QuadrantPlacement {
    let scaled_technical = scale_axis(overall_technical);
    let scaled_emotional = scale_axis(overall_emotional);

    let quadrant = match (scaled_technical >= 0.0, scaled_emotional >= 0.0) {
        (true, true) => Quadrant::Promising,
        (true, false) => Quadrant::Problem,
        (false, true) => Quadrant::Potential,
        (false, false) => Quadrant::Terminate,
    };

    QuadrantPlacement {
        quadrant,
        action: quadrant.action(),
        scaled_technical,
        scaled_emotional,
    }
}

pub fn would_rehire(overall_technical: f64, overall_emotional: f64) -> ScreeningAnswer {
    if overall_technical >= REHIRE_YES_FLOOR && overall_emotional >= REHIRE_YES_FLOOR {
        ScreeningAnswer::Yes
    } else if overall_technical >= REHIRE_MAYBE_FLOOR && overall_emotional >= REHIRE_MAYBE_FLOOR {
        ScreeningAnswer::Maybe
    } else {
        ScreeningAnswer::No
    }
}

pub fn would_miss(overall_score: f64, critical_bias: bool) -> ScreeningAnswer {
    if overall_score >= MISS_YES_FLOOR && !critical_bias {
        ScreeningAnswer::Yes
    } else if (MISS_MAYBE_FLOOR..MISS_YES_FLOOR).contains(&overall_score) {
        ScreeningAnswer::Maybe
    } else {
        ScreeningAnswer::No
    }
}

/// One matrix row per subject, best overall score first.
pub fn build_matrix(records: &[EvaluationRecord], subjects: &[Subject]) -> Vec<MatrixRow> {
    let departments: HashMap<&str, &str> = subjects
        .iter()
        .map(|subject| (subject.name.as_str(), subject.department.as_str()))
        .collect();

    let mut rows: Vec<MatrixRow> = group_by_subject(records)
        .iter()
        .filter_map(|group| {
            let aggregate = aggregate_group(group)?;
            let critical_bias = group
                .records
                .iter()
                .any(|record| record.combined_score() < CRITICAL_BIAS_CEILING);

            Some(MatrixRow {
                placement: classify_quadrant(
                    aggregate.overall_technical,
                    aggregate.overall_emotional,
                ),
                development_action: DevelopmentAction::for_score(aggregate.overall_score),
                would_rehire: would_rehire(
                    aggregate.overall_technical,
                    aggregate.overall_emotional,
                ),
                would_miss: would_miss(aggregate.overall_score, critical_bias),
                department: departments
                    .get(group.subject)
                    .map(|department| department.to_string()),
                aggregate,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.aggregate
            .overall_score
            .partial_cmp(&a.aggregate.overall_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

pub fn action_distribution(rows: &[MatrixRow]) -> Vec<ActionShare> {
    let mut shares: Vec<ActionShare> = Vec::new();
    for row in rows {
        match shares
            .iter_mut()
            .find(|share| share.action == row.development_action)
        {
            Some(share) => share.count += 1,
            None => shares.push(ActionShare {
                action: row.development_action,
                count: 1,
                percentage: 0.0,
            }),
        }
    }

    let total = rows.len();
    for share in shares.iter_mut() {
        share.percentage = if total == 0 {
            0.0
        } else {
            share.count as f64 / total as f64 * 100.0
        };
    }

    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

pub fn quadrant_distribution(rows: &[MatrixRow]) -> Vec<(Quadrant, usize)> {
    [
        Quadrant::Promising,
        Quadrant::Problem,
        Quadrant::Potential,
        Quadrant::Terminate,
    ]
    .into_iter()
    .map(|quadrant| {
        let count = rows
            .iter()
            .filter(|row| row.placement.quadrant == quadrant)
            .count();
        (quadrant, count)
    })
    .collect()
}
