use anyhow::Context;
use clap::Args;

use crate::bias::BiasThresholds;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    database_url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Self {
            log_level: std::env::var("EVALUATIONS_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

/// Overrides for the bias detection thresholds, in percentage points.
#[derive(Debug, Clone, Args)]
pub struct ThresholdArgs {
    #[arg(long, default_value_t = 30.0)]
    pub gap: f64,
    #[arg(long, default_value_t = 40.0)]
    pub severe_gap: f64,
    #[arg(long, default_value_t = 50.0)]
    pub low_score: f64,
    #[arg(long, default_value_t = 30.0)]
    pub severe_low_score: f64,
    #[arg(long, default_value_t = 30.0)]
    pub discrepancy: f64,
    #[arg(long, default_value_t = 40.0)]
    pub manager_low: f64,
    #[arg(long, default_value_t = 30.0)]
    pub manager_severe_low: f64,
    #[arg(long, default_value_t = 95.0)]
    pub manager_high: f64,
}

impl From<&ThresholdArgs> for BiasThresholds {
    fn from(args: &ThresholdArgs) -> Self {
        Self {
            gap: args.gap,
            severe_gap: args.severe_gap,
            low_score: args.low_score,
            severe_low_score: args.severe_low_score,
            discrepancy: args.discrepancy,
            manager_low: args.manager_low,
            manager_severe_low: args.manager_severe_low,
            manager_high: args.manager_high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        thresholds: ThresholdArgs,
    }

    #[test]
    fn flag_defaults_match_detector_defaults() {
        let harness = Harness::parse_from(["harness"]);
        assert_eq!(
            BiasThresholds::from(&harness.thresholds),
            BiasThresholds::default()
        );
    }

    #[test]
    fn flags_override_single_thresholds() {
        let harness = Harness::parse_from(["harness", "--gap", "25", "--manager-high", "90"]);
        let thresholds = BiasThresholds::from(&harness.thresholds);
        assert_eq!(thresholds.gap, 25.0);
        assert_eq!(thresholds.manager_high, 90.0);
        assert_eq!(thresholds.severe_gap, 40.0);
    }
}
