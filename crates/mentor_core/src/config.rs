//! Environment-driven tool configuration.
//!
//! # Responsibility
//! - Collect connection string, input locations and logging settings from
//!   process environment (a `.env` file is loaded by the binary beforehand).
//!
//! # Invariants
//! - Missing optional variables fall back to documented defaults.
//! - Invalid values are rejected with the variable name, never ignored.

use crate::logging::default_log_level;
use crate::model::identity::NameMatching;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const MENTOR_CSV_VAR: &str = "MENTOR_CSV";
pub const CSV_DIR_VAR: &str = "CSV_DIR";
pub const ROSTER_JSON_VAR: &str = "ROSTER_JSON";
pub const SCHEMA_REPORT_VAR: &str = "SCHEMA_REPORT";
pub const LOG_DIR_VAR: &str = "MENTOR_LOG_DIR";
pub const LOG_LEVEL_VAR: &str = "MENTOR_LOG_LEVEL";
pub const NAME_MATCHING_VAR: &str = "MENTOR_NAME_MATCHING";
pub const ROSTER_BATCH_VAR: &str = "ROSTER_BATCH";

const DEFAULT_MENTOR_CSV: &str = "mentor_students.csv";
const DEFAULT_CSV_DIR: &str = "csv_output";
const DEFAULT_ROSTER_JSON: &str = "data/users.json";
const DEFAULT_SCHEMA_REPORT: &str = "schema_output.txt";
const DEFAULT_ROSTER_BATCH: &str = "2026";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingEnvVar(String),
    InvalidEnvValue { var: String, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(var) => write!(f, "missing required environment variable: {var}"),
            Self::InvalidEnvValue { var, reason } => {
                write!(f, "invalid value for environment variable {var}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Only commands touching the database require it.
    pub database_url: Option<String>,
    pub mentor_csv: PathBuf,
    pub csv_dir: PathBuf,
    pub roster_json: PathBuf,
    pub schema_report: PathBuf,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub name_matching: NameMatching,
    pub roster_batch: String,
}

impl ToolConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |var: &str| {
            lookup(var)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let name_matching = match value(NAME_MATCHING_VAR) {
            Some(raw) => NameMatching::parse(&raw).ok_or_else(|| ConfigError::InvalidEnvValue {
                var: NAME_MATCHING_VAR.to_string(),
                reason: format!("`{raw}` is not one of exact|case_insensitive"),
            })?,
            None => NameMatching::default(),
        };

        let log_dir = value(LOG_DIR_VAR).map(PathBuf::from);
        if let Some(dir) = log_dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidEnvValue {
                    var: LOG_DIR_VAR.to_string(),
                    reason: "log directory must be an absolute path".to_string(),
                });
            }
        }

        Ok(Self {
            database_url: value(DATABASE_URL_VAR),
            mentor_csv: value(MENTOR_CSV_VAR)
                .unwrap_or_else(|| DEFAULT_MENTOR_CSV.to_string())
                .into(),
            csv_dir: value(CSV_DIR_VAR)
                .unwrap_or_else(|| DEFAULT_CSV_DIR.to_string())
                .into(),
            roster_json: value(ROSTER_JSON_VAR)
                .unwrap_or_else(|| DEFAULT_ROSTER_JSON.to_string())
                .into(),
            schema_report: value(SCHEMA_REPORT_VAR)
                .unwrap_or_else(|| DEFAULT_SCHEMA_REPORT.to_string())
                .into(),
            log_dir,
            log_level: value(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string()),
            name_matching,
            roster_batch: value(ROSTER_BATCH_VAR)
                .unwrap_or_else(|| DEFAULT_ROSTER_BATCH.to_string()),
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar(DATABASE_URL_VAR.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ToolConfig, DATABASE_URL_VAR, LOG_DIR_VAR, NAME_MATCHING_VAR};
    use crate::model::identity::NameMatching;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ToolConfig, ConfigError> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        ToolConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.mentor_csv, PathBuf::from("mentor_students.csv"));
        assert_eq!(config.schema_report, PathBuf::from("schema_output.txt"));
        assert_eq!(config.name_matching, NameMatching::CaseInsensitive);
        assert!(matches!(
            config.require_database_url(),
            Err(ConfigError::MissingEnvVar(var)) if var == DATABASE_URL_VAR
        ));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[(DATABASE_URL_VAR, "   ")]).unwrap();
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn invalid_matching_and_relative_log_dir_are_rejected() {
        let err = config_from(&[(NAME_MATCHING_VAR, "fuzzy")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnvValue { var, .. } if var == NAME_MATCHING_VAR
        ));

        let err = config_from(&[(LOG_DIR_VAR, "logs")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnvValue { var, .. } if var == LOG_DIR_VAR
        ));
    }
}
