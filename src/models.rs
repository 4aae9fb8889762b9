use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::competencies::FrequencyLevel;

/// Who submitted an evaluation relative to the person being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaterRole {
    #[serde(rename = "self")]
    SelfAssessment,
    Peer,
    Manager,
}

impl RaterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaterRole::SelfAssessment => "self",
            RaterRole::Peer => "peer",
            RaterRole::Manager => "manager",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RaterRole::SelfAssessment => "Self-assessment",
            RaterRole::Peer => "Peer evaluation",
            RaterRole::Manager => "Manager evaluation",
        }
    }
}

impl fmt::Display for RaterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rater role '{0}' (expected self, peer or manager)")]
pub struct UnknownRaterRole(pub String);

impl FromStr for RaterRole {
    type Err = UnknownRaterRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "self" | "auto" => Ok(RaterRole::SelfAssessment),
            "peer" | "par" => Ok(RaterRole::Peer),
            "manager" | "gestor" => Ok(RaterRole::Manager),
            other => Err(UnknownRaterRole(other.to_string())),
        }
    }
}

/// One submitted 360° assessment of a subject by a single rater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub subject: String,
    pub rater_name: String,
    pub rater_role: RaterRole,
    pub technical_scores: BTreeMap<u8, FrequencyLevel>,
    pub emotional_scores: BTreeMap<u8, FrequencyLevel>,
    pub avg_technical: f64,
    pub avg_emotional: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EvaluationRecord {
    /// Technical average, with non-finite values read as zero.
    pub fn technical(&self) -> f64 {
        finite_or_zero(self.avg_technical)
    }

    /// Emotional average, with non-finite values read as zero.
    pub fn emotional(&self) -> f64 {
        finite_or_zero(self.avg_emotional)
    }

    pub fn combined_score(&self) -> f64 {
        (self.technical() + self.emotional()) / 2.0
    }
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Employee as listed by the data store. Only used to enrich output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub department: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Excellent,
    Good,
    Regular,
    Poor,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Excellent => "Excellent",
            Classification::Good => "Good",
            Classification::Regular => "Regular",
            Classification::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    Disapproved,
}

impl ApprovalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Disapproved => "Disapproved",
        }
    }
}

/// Cell of the technical vs. emotional decision matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    Promising,
    Problem,
    Potential,
    Terminate,
}

impl Quadrant {
    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::Promising => "Promising",
            Quadrant::Problem => "Problem",
            Quadrant::Potential => "Potential",
            Quadrant::Terminate => "Terminate",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Quadrant::Promising => "Retain and promote",
            Quadrant::Problem => "Develop or terminate",
            Quadrant::Potential => "Train and develop",
            Quadrant::Terminate => "Terminate",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Quadrant::Promising => {
                "Strong technical performance and attitude. Key employee to retain and promote."
            }
            Quadrant::Problem => {
                "Good technical competence but problematic attitude. Needs behavioral development."
            }
            Quadrant::Potential => {
                "Good attitude but technical skills need work. Invest in training."
            }
            Quadrant::Terminate => "Low technical competence and problematic attitude.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadrantPlacement {
    pub quadrant: Quadrant,
    pub action: &'static str,
    pub scaled_technical: f64,
    pub scaled_emotional: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAggregate {
    pub subject: String,
    pub overall_technical: f64,
    pub overall_emotional: f64,
    pub overall_score: f64,
    pub classification: Classification,
    pub approval: ApprovalStatus,
    pub quadrant: Quadrant,
    pub evaluation_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BiasDetected,
    PossibleFavoritism,
    LowEvaluation,
    Discrepancy,
    ExtremeLow,
    ExtremeHigh,
}

impl AlertKind {
    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::BiasDetected => "bias detected",
            AlertKind::PossibleFavoritism => "possible favoritism",
            AlertKind::LowEvaluation => "low evaluation",
            AlertKind::Discrepancy => "discrepancy",
            AlertKind::ExtremeLow => "extreme low",
            AlertKind::ExtremeHigh => "extreme high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasAlert {
    pub subject: String,
    pub record_id: Option<Uuid>,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningAnswer {
    Yes,
    Maybe,
    No,
}

impl ScreeningAnswer {
    pub fn label(&self) -> &'static str {
        match self {
            ScreeningAnswer::Yes => "yes",
            ScreeningAnswer::Maybe => "maybe",
            ScreeningAnswer::No => "no",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
}

/// Follow-up recommended from the overall score band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentAction {
    Opportunities,
    Development,
    Training,
    VerbalWarning,
    Dismissal,
}

impl DevelopmentAction {
    pub fn for_score(overall_score: f64) -> Self {
        let score = finite_or_zero(overall_score);
        if score >= 80.0 {
            DevelopmentAction::Opportunities
        } else if score >= 60.0 {
            DevelopmentAction::Development
        } else if score >= 40.0 {
            DevelopmentAction::Training
        } else if score >= 20.0 {
            DevelopmentAction::VerbalWarning
        } else {
            DevelopmentAction::Dismissal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DevelopmentAction::Opportunities => "Opportunities",
            DevelopmentAction::Development => "Development",
            DevelopmentAction::Training => "Training",
            DevelopmentAction::VerbalWarning => "Verbal warning",
            DevelopmentAction::Dismissal => "Dismissal",
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            DevelopmentAction::Opportunities => Priority::High,
            DevelopmentAction::Development => Priority::Medium,
            DevelopmentAction::Training => Priority::Medium,
            DevelopmentAction::VerbalWarning => Priority::High,
            DevelopmentAction::Dismissal => Priority::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub aggregate: SubjectAggregate,
    pub placement: QuadrantPlacement,
    pub development_action: DevelopmentAction,
    pub would_rehire: ScreeningAnswer,
    pub would_miss: ScreeningAnswer,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionShare {
    pub action: DevelopmentAction,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub high: usize,
    pub medium: usize,
    pub by_kind: Vec<(AlertKind, usize)>,
}
