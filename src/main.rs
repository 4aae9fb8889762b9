use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use peopleops_evaluations::bias::{self, BiasThresholds};
use peopleops_evaluations::competencies::{CompetencyCategory, FrequencyLevel};
use peopleops_evaluations::config::{AppConfig, ThresholdArgs};
use peopleops_evaluations::{aggregate, db, matrix, report, telemetry};

#[derive(Parser)]
#[command(name = "evaluation-analytics")]
#[command(about = "Scores 360° behavioral evaluations and flags rater bias", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the questionnaire: competencies and the frequency scale
    Competencies,
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import evaluations from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank employees by overall score
    Scores {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// List rater bias alerts
    Alerts {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Place employees on the technical vs. emotional decision matrix
    Matrix {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn questionnaire() -> String {
    let mut output = String::new();
    for category in [CompetencyCategory::Technical, CompetencyCategory::Emotional] {
        let _ = writeln!(output, "{} competencies:", category.label());
        for definition in category.definitions() {
            let _ = writeln!(output, "{:>3}. {}", definition.id, definition.text);
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "Frequency scale:");
    for level in FrequencyLevel::ALL {
        let _ = writeln!(output, "- {} = {}%", level.label(), level.percent());
    }
    output
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();
    telemetry::init(&config.log_level)?;

    match cli.command {
        Commands::Competencies => {
            print!("{}", questionnaire());
        }
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            info!(inserted, path = %csv.display(), "import finished");
            println!("Inserted {inserted} evaluations from {}.", csv.display());
        }
        Commands::Scores {
            subject,
            limit,
            json,
        } => {
            let pool = connect(&config).await?;
            let records = db::fetch_evaluations(&pool, subject.as_deref()).await?;
            let aggregates = aggregate::top_subjects(&records, limit);

            if json {
                return print_json(&aggregates);
            }
            if aggregates.is_empty() {
                println!("No evaluations found.");
                return Ok(());
            }

            println!("Employees by overall score:");
            for aggregate in aggregates.iter() {
                println!(
                    "- {} {:.1}% ({}, {}) technical {:.1}%, emotional {:.1}% across {} evaluations",
                    aggregate.subject,
                    aggregate.overall_score,
                    aggregate.classification.label(),
                    aggregate.approval.label(),
                    aggregate.overall_technical,
                    aggregate.overall_emotional,
                    aggregate.evaluation_count
                );
            }
        }
        Commands::Alerts {
            subject,
            json,
            thresholds,
        } => {
            let pool = connect(&config).await?;
            let records = db::fetch_evaluations(&pool, subject.as_deref()).await?;
            let alerts = bias::detect_with(&records, &BiasThresholds::from(&thresholds));
            info!(evaluations = records.len(), alerts = alerts.len(), "bias scan complete");

            if json {
                return print_json(&alerts);
            }
            if alerts.is_empty() {
                println!("No anomalies detected.");
                return Ok(());
            }

            for alert in bias::by_severity(&alerts) {
                println!(
                    "- [{}] {} ({}): {}",
                    alert.severity.label(),
                    alert.subject,
                    alert.kind.label(),
                    alert.message
                );
            }
        }
        Commands::Matrix { subject, json } => {
            let pool = connect(&config).await?;
            let records = db::fetch_evaluations(&pool, subject.as_deref()).await?;
            let subjects = db::fetch_subjects(&pool).await?;
            let rows = matrix::build_matrix(&records, &subjects);

            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No evaluations found.");
                return Ok(());
            }

            for row in rows.iter() {
                println!(
                    "- {} ({:+.1}, {:+.1}) {}: {}",
                    row.aggregate.subject,
                    row.placement.scaled_technical,
                    row.placement.scaled_emotional,
                    row.placement.quadrant.label(),
                    row.placement.action
                );
            }
        }
        Commands::Report {
            subject,
            out,
            thresholds,
        } => {
            let pool = connect(&config).await?;
            let records = db::fetch_evaluations(&pool, subject.as_deref()).await?;
            let subjects = db::fetch_subjects(&pool).await?;
            let report = report::build_report(
                subject.as_deref(),
                &records,
                &subjects,
                &BiasThresholds::from(&thresholds),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
