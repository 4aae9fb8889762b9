use std::collections::BTreeMap;

use anyhow::Context;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::competencies::{parse_score_list, FrequencyLevel};
use crate::models::{EvaluationRecord, RaterRole, Subject};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn cycle(count: u8, levels: &[FrequencyLevel]) -> BTreeMap<u8, FrequencyLevel> {
    (1..=count)
        .zip(levels.iter().copied().cycle())
        .collect()
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    use FrequencyLevel::*;

    let subjects = vec![
        (
            Uuid::parse_str("5b1f6c1e-8d0a-4c55-9a53-1f0f3f1a7e21")?,
            "Ana Souza",
            "Financial Analyst",
            "Finance",
        ),
        (
            Uuid::parse_str("a2e4d7b0-3c61-4f0e-8f7d-6a4b9e2c1d10")?,
            "Bruno Lima",
            "Support Specialist",
            "Customer Success",
        ),
        (
            Uuid::parse_str("c7d9e3a4-1b2f-4e8c-9d6a-5f3e2b1c0a98")?,
            "Carla Mendes",
            "Software Engineer",
            "Engineering",
        ),
    ];

    for (id, name, role, department) in subjects {
        upsert_subject(pool, id, name, role, department).await?;
    }

    let evaluations = vec![
        (
            "seed-001",
            "Ana Souza",
            "Marcos Prado",
            RaterRole::Manager,
            cycle(17, &[Always, Often, Always]),
            cycle(13, &[Always, Often]),
            Some("Consistently delivers on month-end close"),
        ),
        (
            "seed-002",
            "Ana Souza",
            "Helena Costa",
            RaterRole::Peer,
            cycle(17, &[Often, Always]),
            cycle(13, &[Often, Always, Often]),
            None,
        ),
        (
            "seed-003",
            "Ana Souza",
            "Igor Tavares",
            RaterRole::Peer,
            cycle(17, &[Rarely, Never]),
            cycle(13, &[Never, Rarely]),
            Some("Disagrees with the reporting process"),
        ),
        (
            "seed-004",
            "Bruno Lima",
            "Sofia Ramos",
            RaterRole::Manager,
            cycle(17, &[Rarely, Never, Rarely]),
            cycle(13, &[Never, Rarely, Never]),
            Some("Missed most SLA targets this quarter"),
        ),
        (
            "seed-005",
            "Carla Mendes",
            "Carla Mendes",
            RaterRole::SelfAssessment,
            cycle(17, &[Always, Always, Often]),
            cycle(13, &[Often, Always]),
            None,
        ),
        (
            "seed-006",
            "Carla Mendes",
            "Tiago Nunes",
            RaterRole::Manager,
            cycle(17, &[Sometimes]),
            cycle(13, &[Often, Sometimes]),
            Some("Strong ideas, uneven follow-through"),
        ),
    ];

    for (source_key, subject, rater, role, technical, emotional, notes) in evaluations {
        let record = EvaluationRecord::submit(
            subject,
            rater,
            role,
            technical,
            emotional,
            notes.map(str::to_string),
        )?;
        insert_evaluation(pool, &record, source_key).await?;
    }

    info!("seed data applied");
    Ok(())
}

async fn upsert_subject(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    role: &str,
    department: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO evaluation_analytics.subjects (id, full_name, job_role, department)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (full_name) DO UPDATE
        SET job_role = EXCLUDED.job_role, department = EXCLUDED.department
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(role)
    .bind(department)
    .execute(pool)
    .await?;
    Ok(())
}

async fn ensure_subject(pool: &PgPool, name: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO evaluation_analytics.subjects (id, full_name)
        VALUES ($1, $2)
        ON CONFLICT (full_name) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

/// Stores a record; returns false when `source_key` was already imported.
pub async fn insert_evaluation(
    pool: &PgPool,
    record: &EvaluationRecord,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO evaluation_analytics.evaluations
        (id, subject_name, rater_name, rater_role, technical_scores, emotional_scores,
         avg_technical, avg_emotional, notes, created_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(record.id)
    .bind(&record.subject)
    .bind(&record.rater_name)
    .bind(record.rater_role.as_str())
    .bind(Json(&record.technical_scores))
    .bind(Json(&record.emotional_scores))
    .bind(record.avg_technical)
    .bind(record.avg_emotional)
    .bind(&record.notes)
    .bind(record.created_at)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_evaluations(
    pool: &PgPool,
    subject: Option<&str>,
) -> anyhow::Result<Vec<EvaluationRecord>> {
    let mut query = String::from(
        "SELECT id, subject_name, rater_name, rater_role, technical_scores, emotional_scores, \
         avg_technical, avg_emotional, notes, created_at \
         FROM evaluation_analytics.evaluations",
    );

    if subject.is_some() {
        query.push_str(" WHERE subject_name = $1");
    }
    query.push_str(" ORDER BY created_at DESC");

    let mut rows = sqlx::query(&query);
    if let Some(value) = subject {
        rows = rows.bind(value);
    }

    let records = rows
        .fetch_all(pool)
        .await?
        .iter()
        .map(evaluation_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

    debug!(count = records.len(), "loaded evaluations");
    Ok(records)
}

fn evaluation_from_row(row: &PgRow) -> anyhow::Result<EvaluationRecord> {
    let id: Uuid = row.try_get("id")?;
    let raw_role: String = row.try_get("rater_role")?;
    let rater_role = raw_role.parse::<RaterRole>().unwrap_or_else(|err| {
        warn!(%id, %err, "treating unrecognized rater role as peer");
        RaterRole::Peer
    });

    Ok(EvaluationRecord {
        id,
        subject: row.try_get("subject_name")?,
        rater_name: row.try_get("rater_name")?,
        rater_role,
        technical_scores: score_map(id, row.try_get("technical_scores").ok()),
        emotional_scores: score_map(id, row.try_get("emotional_scores").ok()),
        avg_technical: lenient_average(row, "avg_technical"),
        avg_emotional: lenient_average(row, "avg_emotional"),
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn lenient_average(row: &PgRow, column: &str) -> f64 {
    row.try_get::<Option<f64>, _>(column)
        .ok()
        .flatten()
        .unwrap_or(0.0)
}

fn score_map(id: Uuid, value: Option<Value>) -> BTreeMap<u8, FrequencyLevel> {
    match value.map(serde_json::from_value::<BTreeMap<u8, FrequencyLevel>>) {
        Some(Ok(scores)) => scores,
        Some(Err(err)) => {
            warn!(%id, %err, "ignoring unreadable raw scores");
            BTreeMap::new()
        }
        None => BTreeMap::new(),
    }
}

pub async fn fetch_subjects(pool: &PgPool) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query(
        "SELECT id, full_name, job_role, department \
         FROM evaluation_analytics.subjects ORDER BY full_name",
    )
    .fetch_all(pool)
    .await?;

    let mut subjects = Vec::new();
    for row in rows {
        subjects.push(Subject {
            id: row.get("id"),
            name: row.get("full_name"),
            role: row.get("job_role"),
            department: row.get("department"),
        });
    }

    Ok(subjects)
}

#[derive(Debug, serde::Deserialize)]
pub struct CsvRow {
    pub subject: String,
    pub rater_name: String,
    pub rater_role: String,
    pub technical_scores: String,
    pub emotional_scores: String,
    pub notes: Option<String>,
    pub source_key: Option<String>,
}

impl CsvRow {
    pub fn into_record(self) -> anyhow::Result<(EvaluationRecord, Option<String>)> {
        let role: RaterRole = self.rater_role.parse()?;
        let record = EvaluationRecord::submit(
            &self.subject,
            &self.rater_name,
            role,
            parse_score_list(&self.technical_scores)?,
            parse_score_list(&self.emotional_scores)?,
            self.notes,
        )?;
        Ok((record, self.source_key))
    }
}

/// Parses and validates every row; any bad row rejects the whole file.
pub fn read_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<(EvaluationRecord, String)>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let (record, source_key) = row
            .into_record()
            .with_context(|| format!("invalid evaluation on data row {}", line + 1))?;
        let source_key = source_key.unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        rows.push((record, source_key));
    }

    Ok(rows)
}

/// Distinct subject names in first-appearance order.
fn imported_subjects(rows: &[(EvaluationRecord, String)]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for (record, _) in rows {
        if !names.contains(&record.subject.as_str()) {
            names.push(&record.subject);
        }
    }
    names
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let rows = read_csv(csv_path)?;

    // Known subjects keep their role and department.
    for name in imported_subjects(&rows) {
        ensure_subject(pool, name).await?;
    }

    let mut inserted = 0usize;
    for (record, source_key) in &rows {
        if insert_evaluation(pool, record, source_key).await? {
            inserted += 1;
        } else {
            debug!(%source_key, "evaluation already imported");
        }
    }

    Ok(inserted)
}
