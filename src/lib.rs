//! Scoring and rater-bias analytics for 360° behavioral evaluations.
//!
//! The analytics modules (`aggregate`, `matrix`, `bias`) are pure functions
//! over a snapshot of [`models::EvaluationRecord`]s. `db`, `report`,
//! `config` and `telemetry` back the `evaluation-analytics` binary.

pub mod aggregate;
pub mod bias;
pub mod competencies;
pub mod config;
pub mod db;
pub mod matrix;
pub mod models;
pub mod report;
pub mod telemetry;

pub use aggregate::compute_subject_aggregates;
pub use bias::{compute_bias_alerts, BiasThresholds};
pub use matrix::classify_quadrant;
