//! Estimator configuration loaded from environment variables.

use serde::{Deserialize, Serialize};

use crate::{Engine, EstimatorError, Result};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Estimator configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL` — connection string; its scheme selects the backend (required)
/// - `COUNT_ESTIMATOR_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `COUNT_ESTIMATOR_APPROXIMATE` — allow the statistics path (default: `true`)
/// - `COUNT_ESTIMATOR_LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub approximate: bool,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl EstimatorConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| EstimatorError::Config("DATABASE_URL is not set".to_string()))?;

        let max_connections = match lookup("COUNT_ESTIMATOR_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|_| {
                EstimatorError::Config(format!("COUNT_ESTIMATOR_MAX_CONNECTIONS: bad value {raw:?}"))
            })?,
            None => defaults.max_connections,
        };

        let approximate = match lookup("COUNT_ESTIMATOR_APPROXIMATE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                EstimatorError::Config(format!("COUNT_ESTIMATOR_APPROXIMATE: bad value {raw:?}"))
            })?,
            None => defaults.approximate,
        };

        let log_format = match lookup("COUNT_ESTIMATOR_LOG_FORMAT")
            .map(|raw| raw.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => LogFormat::Json,
            Some("text") | None => LogFormat::Text,
            Some(other) => {
                return Err(EstimatorError::Config(format!(
                    "COUNT_ESTIMATOR_LOG_FORMAT: bad value {other:?}"
                )));
            }
        };

        Ok(Self {
            database_url,
            max_connections,
            approximate,
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
        })
    }

    /// Returns the engine named by the database URL scheme.
    pub fn engine(&self) -> Result<Engine> {
        Engine::from_url(&self.database_url).ok_or_else(|| {
            EstimatorError::Config(format!(
                "unsupported database URL scheme in {:?}",
                self.database_url.split("://").next().unwrap_or_default()
            ))
        })
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: 5,
            approximate: true,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = EstimatorConfig::default();
        assert_eq!(config.max_connections, 5);
        assert!(config.approximate);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_database_url_is_required() {
        let err = EstimatorConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, EstimatorError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let config = EstimatorConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://root@localhost/shop"),
            ("COUNT_ESTIMATOR_MAX_CONNECTIONS", "12"),
            ("COUNT_ESTIMATOR_APPROXIMATE", "off"),
            ("COUNT_ESTIMATOR_LOG_FORMAT", "json"),
            ("RUST_LOG", "count_estimator=debug"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 12);
        assert!(!config.approximate);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "count_estimator=debug");
        assert_eq!(config.engine().unwrap(), Engine::MySql);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let bad_pool = EstimatorConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/shop"),
            ("COUNT_ESTIMATOR_MAX_CONNECTIONS", "many"),
        ]));
        assert!(bad_pool.is_err());

        let bad_flag = EstimatorConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/shop"),
            ("COUNT_ESTIMATOR_APPROXIMATE", "sometimes"),
        ]));
        assert!(bad_flag.is_err());
    }

    #[test]
    fn test_log_format_is_case_insensitive() {
        let config = EstimatorConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/shop"),
            ("COUNT_ESTIMATOR_LOG_FORMAT", " JSON "),
        ]))
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        let config = EstimatorConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/shop"),
            ("COUNT_ESTIMATOR_LOG_FORMAT", "Text"),
        ]))
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Text);

        let bad = EstimatorConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/shop"),
            ("COUNT_ESTIMATOR_LOG_FORMAT", "xml"),
        ]));
        assert!(bad.is_err());
    }

    #[test]
    fn test_unknown_scheme() {
        let config = EstimatorConfig::from_lookup(lookup(&[("DATABASE_URL", "sqlite://shop.db")])).unwrap();
        assert!(config.engine().is_err());
    }
}
