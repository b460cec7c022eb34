//! A single configuration source: a YAML file on disk or an in-memory buffer.

use super::merge::deep_merge;
use super::types::ConfigMapping;
use crate::error::{ConfigError, ConfigResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_yaml::Value;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Prefix marking an in-memory source instead of a filesystem path.
pub const DATA_URI_PREFIX: &str = "data://";

/// Token replaced with the project root directory.
pub const ROOT_TOKEN: &str = "%root%";

/// Token replaced with the directory of the plugin file being loaded.
pub const MODULE_TOKEN: &str = "%module%";

/// Raw content of one configuration source.
///
/// Variables are substituted on the raw buffer, so `apply_variables` must run
/// before `to_mapping`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Where the buffer came from (file path or `data://` marker).
    path: String,
    buffer: String,
}

impl ConfigFile {
    /// Read a config file from disk, or decode a `data://` marker.
    ///
    /// Returns `NotReadable` when the path cannot be resolved or opened,
    /// `Read` when the content cannot be retrieved afterwards and `Parse` when
    /// it is not UTF-8 text.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let display = path.to_string_lossy().into_owned();

        if let Some(data) = display.strip_prefix(DATA_URI_PREFIX) {
            let buffer = decode_data_uri(data).map_err(|reason| ConfigError::Read {
                path: display.clone(),
                source: std::io::Error::new(ErrorKind::InvalidData, reason),
            })?;
            return Ok(Self::from_buffer(display, buffer));
        }

        let real_path = std::fs::canonicalize(path)
            .map_err(|e| ConfigError::not_readable(display.clone(), Some(e)))?;

        let mut file = std::fs::File::open(&real_path)
            .map_err(|e| ConfigError::not_readable(display.clone(), Some(e)))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| ConfigError::Read {
                path: display.clone(),
                source,
            })?;

        let buffer = String::from_utf8(bytes)
            .map_err(|e| ConfigError::parse(&display, format!("content is not UTF-8: {}", e)))?;

        Ok(Self::from_buffer(display, buffer))
    }

    /// Wrap an in-memory buffer. `path` is only used in error messages.
    pub fn from_buffer(path: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            buffer: buffer.into(),
        }
    }

    /// Replace `%root%` with `root` and `%module%` with the plugin directory
    /// (or the empty string when there is none).
    pub fn apply_variables(&mut self, root: &str, module_dir: Option<&Path>) {
        let module = module_dir
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.buffer = self
            .buffer
            .replace(MODULE_TOKEN, &module)
            .replace(ROOT_TOKEN, root);
    }

    /// Parse the buffer as YAML. The top level must be a mapping; an empty
    /// document is an empty mapping.
    pub fn to_mapping(&self) -> ConfigResult<ConfigMapping> {
        if self.buffer.trim().is_empty() {
            return Ok(ConfigMapping::new());
        }

        let value: Value = serde_yaml::from_str(&self.buffer)
            .map_err(|e| ConfigError::parse(&self.path, e.to_string()))?;

        match value {
            Value::Mapping(mapping) => Ok(mapping),
            // Comment-only documents
            Value::Null => Ok(ConfigMapping::new()),
            Value::Sequence(_) => Err(ConfigError::parse(
                &self.path,
                "top level is a sequence, expected a mapping",
            )),
            Value::Tagged(_) => Err(ConfigError::parse(
                &self.path,
                "top level is a tagged value, expected a mapping",
            )),
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Err(ConfigError::parse(
                &self.path,
                "top level is a scalar, expected a mapping",
            )),
        }
    }

    /// Parse this file and merge it on top of `base`.
    pub fn merge_into(&self, base: &ConfigMapping) -> ConfigResult<ConfigMapping> {
        Ok(deep_merge(base, &self.to_mapping()?))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }
}

/// Decode the part after `data://`: `<mime>[;base64],<payload>`.
fn decode_data_uri(data: &str) -> Result<String, String> {
    let (header, payload) = data
        .split_once(',')
        .ok_or_else(|| "data URI is missing the ',' separator".to_string())?;

    if header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("invalid base64 payload: {}", e))?;
        return String::from_utf8(bytes).map_err(|e| format!("payload is not UTF-8: {}", e));
    }

    urlencoding::decode(payload)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| format!("invalid percent-encoding: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_root_substitution() {
        let mut file = ConfigFile::from_buffer("test.yaml", "data_dir: '%root%/data'\n");
        file.apply_variables("/srv/app", None);
        let map = file.to_mapping().unwrap();
        assert_eq!(map.get("data_dir"), Some(&Value::from("/srv/app/data")));
    }

    #[test]
    fn test_module_substitution() {
        let mut file =
            ConfigFile::from_buffer("plugin.yaml", "path: '%module%/src'\nother: '%module%'\n");
        file.apply_variables("/srv/app", Some(Path::new("/opt/modules/foo")));
        assert_eq!(file.buffer(), "path: '/opt/modules/foo/src'\nother: '/opt/modules/foo'\n");
    }

    #[test]
    fn test_module_without_context_is_empty() {
        let mut file = ConfigFile::from_buffer("user.yaml", "path: '%module%/src'\n");
        file.apply_variables("", None);
        assert_eq!(file.to_mapping().unwrap().get("path"), Some(&Value::from("/src")));
    }

    #[test]
    fn test_empty_buffer_is_empty_mapping() {
        assert!(ConfigFile::from_buffer("e.yaml", "").to_mapping().unwrap().is_empty());
        assert!(ConfigFile::from_buffer("e.yaml", "  \n").to_mapping().unwrap().is_empty());
        let comment_only = ConfigFile::from_buffer("e.yaml", "# only a comment\n");
        assert!(comment_only.to_mapping().unwrap().is_empty());
    }

    #[test]
    fn test_scalar_top_level_is_error() {
        let err = ConfigFile::from_buffer("s.yaml", "just a string").to_mapping().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert_eq!(err.path(), Some("s.yaml"));
    }

    #[test]
    fn test_sequence_top_level_is_error() {
        let err = ConfigFile::from_buffer("l.yaml", "- a\n- b\n").to_mapping().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseError);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let err = ConfigFile::from_buffer("bad.yaml", "a: [1, 2\nb: {").to_mapping().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_load_missing_file_is_not_readable() {
        let temp = TempDir::new().unwrap();
        let err = ConfigFile::load(temp.path().join("nope.yaml")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotReadable);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_load_directory_is_read_error() {
        let temp = TempDir::new().unwrap();
        let err = ConfigFile::load(temp.path()).unwrap_err();
        // Opening a directory succeeds on unix, reading it does not.
        assert!(matches!(err.code(), ErrorCode::ReadError | ErrorCode::NotReadable));
    }

    #[test]
    fn test_load_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("c.yaml");
        std::fs::write(&path, "a:\n  b: 1\n").unwrap();
        let file = ConfigFile::load(&path).unwrap();
        assert_eq!(file.path(), path.to_string_lossy());
        assert_eq!(file.to_mapping().unwrap().len(), 1);
    }

    #[test]
    fn test_load_invalid_utf8_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("binary.yaml");
        std::fs::write(&path, b"a: \xff\xfe\n").unwrap();
        let err = ConfigFile::load(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert_eq!(err.path(), Some(path.to_string_lossy().as_ref()));
    }

    #[test]
    fn test_data_uri_plain() {
        let file = ConfigFile::load("data://text/plain,a%3A%201").unwrap();
        assert_eq!(file.buffer(), "a: 1");
        assert_eq!(file.to_mapping().unwrap().get("a"), Some(&Value::from(1)));
    }

    #[test]
    fn test_data_uri_base64() {
        // "a: 1\n"
        let file = ConfigFile::load("data://text/plain;base64,YTogMQo=").unwrap();
        assert_eq!(file.buffer(), "a: 1\n");
    }

    #[test]
    fn test_data_uri_without_separator_is_read_error() {
        let err = ConfigFile::load("data://text/plain").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ReadError);
    }

    #[test]
    fn test_merge_into() {
        let base: ConfigMapping = serde_yaml::from_str("a: 1\nlist: [x]\n").unwrap();
        let file = ConfigFile::from_buffer("o.yaml", "a: 2\nlist: [y]\n");
        let merged = file.merge_into(&base).unwrap();
        let expected: ConfigMapping = serde_yaml::from_str("a: 2\nlist: [x, y]\n").unwrap();
        assert_eq!(merged, expected);
    }
}
