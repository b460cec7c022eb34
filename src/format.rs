//! Output formatting for resolved configuration values and errors.

use crate::error::{ConfigError, ErrorCode};
use anyhow::Result;
use serde::Serialize;
use serde_yaml::Value;

/// Output format for configuration dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Render a configuration value.
pub fn format_value(value: &Value, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(value)?;
            json.push('\n');
            json
        }
    };
    Ok(rendered)
}

/// Structured error for machine-readable output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&ConfigError> for ErrorReport {
    fn from(err: &ConfigError) -> Self {
        let details = std::error::Error::source(err).map(|source| source.to_string());
        Self {
            code: err.code(),
            message: err.to_string(),
            path: err.path().map(str::to_string),
            details,
        }
    }
}

/// Render an error: one line for YAML output, an object for JSON.
pub fn format_error(err: &ConfigError, format: OutputFormat) -> String {
    let report = ErrorReport::from(err);
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)
            .unwrap_or_else(|_| report.message.clone()),
        OutputFormat::Yaml => match report.details {
            Some(details) => format!("error: {}: {}", report.message, details),
            None => format!("error: {}", report.message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_json_integer_keys() {
        let value: Value = serde_yaml::from_str("a: {0: x, 1: y}\nb: [1, 2]\n").unwrap();
        let json = format_value(&value, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["a"]["1"], "y");
        assert_eq!(parsed["b"][1], 2);
    }

    #[test]
    fn test_format_value_yaml() {
        let value: Value = serde_yaml::from_str("a: 1\n").unwrap();
        assert_eq!(format_value(&value, OutputFormat::Yaml).unwrap(), "a: 1\n");
    }

    #[test]
    fn test_format_error_json() {
        let err = ConfigError::parse(
            "/etc/n98-magerun.yaml",
            "top level is a scalar, expected a mapping",
        );
        let json = format_error(&err, OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["code"], "PARSE_ERROR");
        assert_eq!(parsed["path"], "/etc/n98-magerun.yaml");
    }

    #[test]
    fn test_format_error_includes_source() {
        let cause = ConfigError::not_readable("config.yaml", None);
        let err = ConfigError::missing_dist("config.yaml", cause);
        let line = format_error(&err, OutputFormat::Yaml);
        assert!(line.starts_with("error: dist config 'config.yaml'"));
        assert!(line.contains("not readable"));
    }
}
