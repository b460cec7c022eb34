//! Error types for configuration loading.

use serde::Serialize;
use std::io;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Source errors
    NotReadable,
    ReadError,
    ParseError,

    // Environment errors
    InvalidEnvironment,
    MissingMandatorySource,

    // Lifecycle errors
    NotYetLoaded,
    LoaderAlreadySet,
    NoLoader,
}

/// Errors raised while locating, reading, parsing or querying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A candidate file does not exist or cannot be opened.
    #[error("config file is not readable: \"{path}\"")]
    NotReadable {
        path: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The file could be opened but its content could not be retrieved.
    #[error("failed while reading config file \"{path}\"")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The content is not valid YAML or is not a mapping at the top level.
    #[error("failed to parse config file '{path}': {reason}")]
    Parse { path: String, reason: String },

    /// The platform reports a home directory that is not a directory.
    #[error("home directory '{path}' is not a directory")]
    InvalidEnvironment { path: String },

    /// The dist config is missing or unusable.
    #[error("dist config '{path}' could not be loaded")]
    MissingMandatorySource {
        path: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("configuration has not been loaded yet, run stage two first")]
    NotYetLoaded,

    #[error("configuration loader is already initialized")]
    LoaderAlreadySet,

    #[error("no configuration loader has been set")]
    NoLoader,
}

impl ConfigError {
    pub fn not_readable(path: impl Into<String>, source: Option<io::Error>) -> Self {
        Self::NotReadable {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_dist(path: impl Into<String>, source: ConfigError) -> Self {
        Self::MissingMandatorySource {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::NotReadable { .. } => ErrorCode::NotReadable,
            ConfigError::Read { .. } => ErrorCode::ReadError,
            ConfigError::Parse { .. } => ErrorCode::ParseError,
            ConfigError::InvalidEnvironment { .. } => ErrorCode::InvalidEnvironment,
            ConfigError::MissingMandatorySource { .. } => ErrorCode::MissingMandatorySource,
            ConfigError::NotYetLoaded => ErrorCode::NotYetLoaded,
            ConfigError::LoaderAlreadySet => ErrorCode::LoaderAlreadySet,
            ConfigError::NoLoader => ErrorCode::NoLoader,
        }
    }

    /// Only an unreadable candidate can be skipped in favour of the next one.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConfigError::NotReadable { .. })
    }

    /// Path or origin of the file this error is about, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            ConfigError::NotReadable { path, .. }
            | ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::InvalidEnvironment { path }
            | ConfigError::MissingMandatorySource { path, .. } => Some(path),
            ConfigError::NotYetLoaded | ConfigError::LoaderAlreadySet | ConfigError::NoLoader => {
                None
            }
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::MissingMandatorySource).unwrap();
        assert_eq!(json, "\"MISSING_MANDATORY_SOURCE\"");
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = ConfigError::parse("/home/me/.n98-magerun.yaml", "top level is a sequence");
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert_eq!(err.path(), Some("/home/me/.n98-magerun.yaml"));
        assert!(err.to_string().contains("/home/me/.n98-magerun.yaml"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_only_not_readable_is_recoverable() {
        assert!(ConfigError::not_readable("x.yaml", None).is_recoverable());
        assert!(!ConfigError::NotYetLoaded.is_recoverable());
        let cause = ConfigError::not_readable("config.yaml", None);
        let dist = ConfigError::missing_dist("config.yaml", cause);
        assert!(!dist.is_recoverable());
        assert_eq!(dist.code(), ErrorCode::MissingMandatorySource);
    }
}
