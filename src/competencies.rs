use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EvaluationRecord, RaterRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetencyCategory {
    Technical,
    Emotional,
}

impl CompetencyCategory {
    pub fn label(&self) -> &'static str {
        match self {
            CompetencyCategory::Technical => "technical",
            CompetencyCategory::Emotional => "emotional",
        }
    }

    pub fn definitions(&self) -> &'static [CompetencyDefinition] {
        match self {
            CompetencyCategory::Technical => TECHNICAL_COMPETENCIES,
            CompetencyCategory::Emotional => EMOTIONAL_COMPETENCIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompetencyDefinition {
    pub id: u8,
    pub text: &'static str,
}

const fn competency(id: u8, text: &'static str) -> CompetencyDefinition {
    CompetencyDefinition { id, text }
}

pub const TECHNICAL_COMPETENCIES: &[CompetencyDefinition] = &[
    competency(1, "Is committed to the organization's goals"),
    competency(2, "Achieves the desired results"),
    competency(3, "Pays attention to everything they do"),
    competency(4, "Consistently works at a high level in their role"),
    competency(5, "Makes appropriate decisions when needed"),
    competency(6, "Contributes ideas and suggestions for improvement"),
    competency(7, "Listens to feedback and seeks to improve"),
    competency(8, "Sets the right priorities at the right time"),
    competency(9, "Has efficient practices and systems for the work"),
    competency(10, "Communicates important information efficiently"),
    competency(11, "Honors all commitments"),
    competency(12, "Warns when a promise cannot be kept"),
    competency(13, "Is skilled at giving and receiving performance feedback"),
    competency(14, "Seeks to exceed customer expectations"),
    competency(15, "Acts positively when looking for chances to learn"),
    competency(16, "Understands current and future work technologies"),
    competency(17, "Takes responsibility for their own professional development"),
];

pub const EMOTIONAL_COMPETENCIES: &[CompetencyDefinition] = &[
    competency(1, "Self-confidence: has a solid sense of their own worth and abilities"),
    competency(2, "Emotional self-control: keeps emotions and impulses in check"),
    competency(3, "Achievement: drives to keep improving performance"),
    competency(4, "Initiative: is ready to act and seize opportunities"),
    competency(5, "Transparency: is honest, upright and trustworthy"),
    competency(6, "Flexibility: adapts to different people and situations"),
    competency(7, "Optimism: sees the upside of events in any situation"),
    competency(8, "Empathy: notices others' emotions and cares about their concerns"),
    competency(9, "Service: recognizes and meets the needs of reports and customers"),
    competency(10, "Inspirational leadership: guides and motivates with a compelling vision"),
    competency(11, "Influence: is able to persuade and influence people"),
    competency(12, "Conflict management: resolves disagreements toward integration"),
    competency(13, "Teamwork: earns collaboration and high team performance"),
];

/// How often a behavior is observed, stored as its percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FrequencyLevel {
    Never,
    Rarely,
    Sometimes,
    Often,
    Always,
}

impl FrequencyLevel {
    pub const ALL: [FrequencyLevel; 5] = [
        FrequencyLevel::Never,
        FrequencyLevel::Rarely,
        FrequencyLevel::Sometimes,
        FrequencyLevel::Often,
        FrequencyLevel::Always,
    ];

    pub fn percent(&self) -> u8 {
        match self {
            FrequencyLevel::Never => 0,
            FrequencyLevel::Rarely => 25,
            FrequencyLevel::Sometimes => 50,
            FrequencyLevel::Often => 75,
            FrequencyLevel::Always => 100,
        }
    }

    pub fn from_percent(value: u8) -> Result<Self, SubmissionError> {
        Self::ALL
            .into_iter()
            .find(|level| level.percent() == value)
            .ok_or(SubmissionError::OffScale(value))
    }

    pub fn label(&self) -> &'static str {
        match self {
            FrequencyLevel::Never => "Never",
            FrequencyLevel::Rarely => "Rarely",
            FrequencyLevel::Sometimes => "Sometimes",
            FrequencyLevel::Often => "Often",
            FrequencyLevel::Always => "Always",
        }
    }
}

impl TryFrom<u8> for FrequencyLevel {
    type Error = SubmissionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_percent(value)
    }
}

impl From<FrequencyLevel> for u8 {
    fn from(value: FrequencyLevel) -> Self {
        value.percent()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("{0} is not on the frequency scale (0, 25, 50, 75, 100)")]
    OffScale(u8),
    #[error("'{0}' is not a numeric score")]
    NotANumber(String),
    #[error("{category} competency {id} does not exist")]
    UnknownCompetency { category: &'static str, id: u8 },
    #[error("{category} scores are incomplete: {answered} of {expected} competencies answered")]
    Incomplete {
        category: &'static str,
        answered: usize,
        expected: usize,
    },
    #[error("subject name must not be empty")]
    MissingSubject,
}

/// Checks that `scores` answers every competency in `category` and nothing else.
pub fn validate_scores(
    category: CompetencyCategory,
    scores: &BTreeMap<u8, FrequencyLevel>,
) -> Result<(), SubmissionError> {
    let definitions = category.definitions();
    if let Some(id) = scores
        .keys()
        .find(|id| !definitions.iter().any(|definition| definition.id == **id))
    {
        return Err(SubmissionError::UnknownCompetency {
            category: category.label(),
            id: *id,
        });
    }

    if scores.len() != definitions.len() {
        return Err(SubmissionError::Incomplete {
            category: category.label(),
            answered: scores.len(),
            expected: definitions.len(),
        });
    }

    Ok(())
}

/// Mean percentage of a score set; zero for an empty set.
pub fn average(scores: &BTreeMap<u8, FrequencyLevel>) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let total: u32 = scores.values().map(|level| u32::from(level.percent())).sum();
    f64::from(total) / scores.len() as f64
}

/// Parses a `;` or `,` separated list of percentages into ids 1..=N.
pub fn parse_score_list(raw: &str) -> Result<BTreeMap<u8, FrequencyLevel>, SubmissionError> {
    let mut scores = BTreeMap::new();
    for (index, token) in raw
        .split([';', ','])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .enumerate()
    {
        let value: u8 = token
            .parse()
            .map_err(|_| SubmissionError::NotANumber(token.to_string()))?;
        let id = u8::try_from(index + 1).map_err(|_| SubmissionError::OffScale(value))?;
        scores.insert(id, FrequencyLevel::from_percent(value)?);
    }
    Ok(scores)
}

impl EvaluationRecord {
    /// Builds a record from a complete set of raw answers, computing both averages.
    pub fn submit(
        subject: &str,
        rater_name: &str,
        rater_role: RaterRole,
        technical_scores: BTreeMap<u8, FrequencyLevel>,
        emotional_scores: BTreeMap<u8, FrequencyLevel>,
        notes: Option<String>,
    ) -> Result<Self, SubmissionError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(SubmissionError::MissingSubject);
        }

        validate_scores(CompetencyCategory::Technical, &technical_scores)?;
        validate_scores(CompetencyCategory::Emotional, &emotional_scores)?;

        let rater_name = match rater_name.trim() {
            "" => "Unknown".to_string(),
            name => name.to_string(),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            rater_name,
            rater_role,
            avg_technical: average(&technical_scores),
            avg_emotional: average(&emotional_scores),
            technical_scores,
            emotional_scores,
            notes: notes.filter(|note| !note.trim().is_empty()),
            created_at: Utc::now(),
        })
    }
}
