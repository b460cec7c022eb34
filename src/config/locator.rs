//! Candidate locations for user, project and stop-file configuration.

use super::file::ConfigFile;
use crate::error::{ConfigError, ConfigResult};
use crate::paths;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Finds the optional config files that depend on the user's home directory
/// or on the project root.
///
/// Every file returned has `%root%` already substituted with the project root.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    /// Basename of the config file (`n98-magerun.yaml`)
    config_file_name: String,
    /// Project root, empty when not yet known
    project_root: PathBuf,
    /// Home directory as reported by the platform
    home_dir: Option<PathBuf>,
}

impl ConfigLocator {
    /// Create a locator using the platform's home directory.
    pub fn new(config_file_name: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            config_file_name: config_file_name.into(),
            project_root: project_root.into(),
            home_dir: paths::home_dir(),
        }
    }

    /// Override the home directory (`None` means there is no home directory).
    pub fn with_home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    /// Candidate user config paths, in lookup order.
    ///
    /// Fails with `InvalidEnvironment` when a home directory is reported but
    /// is not a directory.
    pub fn user_config_paths(&self) -> ConfigResult<Vec<PathBuf>> {
        let Some(home) = self.home_dir.as_ref() else {
            return Ok(Vec::new());
        };

        if !home.is_dir() {
            return Err(ConfigError::InvalidEnvironment {
                path: home.to_string_lossy().into_owned(),
            });
        }

        let mut candidates = Vec::new();
        if cfg!(windows) {
            candidates.push(home.join(&self.config_file_name));
        }
        candidates.push(home.join(format!(".{}", self.config_file_name)));
        Ok(candidates)
    }

    /// First readable user config file, if any.
    pub fn user_config_file(&self) -> ConfigResult<Option<ConfigFile>> {
        for candidate in self.user_config_paths()? {
            if !candidate.is_file() {
                continue;
            }
            if let Some(file) = self.load_candidate(&candidate)? {
                return Ok(Some(file));
            }
        }
        Ok(None)
    }

    /// Project config under `{root}/app/etc/`, if the root is known and the
    /// file is readable.
    pub fn project_config_file(&self) -> ConfigResult<Option<ConfigFile>> {
        if self.project_root.as_os_str().is_empty() {
            return Ok(None);
        }

        let path = self
            .project_root
            .join("app")
            .join("etc")
            .join(&self.config_file_name);

        if !path.is_file() {
            return Ok(None);
        }
        self.load_candidate(&path)
    }

    /// Dotfile config inside the folder that holds the stop file.
    pub fn stop_file_config_file(
        &self,
        stop_file_folder: &Path,
    ) -> ConfigResult<Option<ConfigFile>> {
        if stop_file_folder.as_os_str().is_empty() {
            return Ok(None);
        }

        let path = stop_file_folder.join(format!(".{}", self.config_file_name));
        if !path.is_file() {
            return Ok(None);
        }
        self.load_candidate(&path)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Load one candidate; an unreadable file counts as absent.
    fn load_candidate(&self, path: &Path) -> ConfigResult<Option<ConfigFile>> {
        match ConfigFile::load(path) {
            Ok(mut file) => {
                file.apply_variables(&self.project_root.to_string_lossy(), None);
                debug!(path = %path.display(), "Located config file");
                Ok(Some(file))
            }
            Err(e) if e.is_recoverable() => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable config file");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_yaml::Value;
    use tempfile::TempDir;

    const NAME: &str = "n98-magerun.yaml";

    fn locator(root: &Path, home: Option<PathBuf>) -> ConfigLocator {
        ConfigLocator::new(NAME, root).with_home_dir(home)
    }

    #[test]
    fn test_user_config_from_home_dotfile() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(home.join(".n98-magerun.yaml"), "root: '%root%'\n").unwrap();

        let file = locator(Path::new("/srv/app"), Some(home))
            .user_config_file()
            .unwrap()
            .unwrap();
        let map = file.to_mapping().unwrap();
        assert_eq!(map.get("root"), Some(&Value::from("/srv/app")));
    }

    #[test]
    fn test_no_home_dir_means_no_user_config() {
        let located = locator(Path::new(""), None).user_config_file().unwrap();
        assert!(located.is_none());
    }

    #[test]
    fn test_home_without_config_file() {
        let temp = TempDir::new().unwrap();
        let located = locator(Path::new(""), Some(temp.path().to_path_buf()))
            .user_config_file()
            .unwrap();
        assert!(located.is_none());
    }

    #[test]
    fn test_home_that_is_not_a_directory_is_invalid_environment() {
        let temp = TempDir::new().unwrap();
        let not_a_dir = temp.path().join("file");
        std::fs::write(&not_a_dir, "").unwrap();

        let err = locator(Path::new(""), Some(not_a_dir)).user_config_file().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEnvironment);
    }

    #[test]
    fn test_home_that_does_not_exist_is_invalid_environment() {
        let temp = TempDir::new().unwrap();
        let err = locator(Path::new(""), Some(temp.path().join("missing")))
            .user_config_file()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEnvironment);
    }

    #[test]
    fn test_project_config_file() {
        let temp = TempDir::new().unwrap();
        let etc = temp.path().join("app").join("etc");
        std::fs::create_dir_all(&etc).unwrap();
        std::fs::write(etc.join(NAME), "k: 1\n").unwrap();

        let file = locator(temp.path(), None).project_config_file().unwrap();
        assert!(file.is_some());
        assert!(file.unwrap().path().ends_with("app/etc/n98-magerun.yaml"));
    }

    #[test]
    fn test_project_config_requires_root() {
        assert!(locator(Path::new(""), None).project_config_file().unwrap().is_none());
    }

    #[test]
    fn test_project_config_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(locator(temp.path(), None).project_config_file().unwrap().is_none());
    }

    #[test]
    fn test_stop_file_config() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".n98-magerun.yaml"), "k: 2\n").unwrap();

        let loc = locator(Path::new("/srv/app"), None);
        assert!(loc.stop_file_config_file(temp.path()).unwrap().is_some());
        assert!(loc.stop_file_config_file(Path::new("")).unwrap().is_none());
        assert!(
            loc.stop_file_config_file(&temp.path().join("elsewhere"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_directory_candidates_count_as_absent() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        let stop = temp.path().join("stop");
        std::fs::create_dir_all(home.join(".n98-magerun.yaml")).unwrap();
        std::fs::create_dir_all(stop.join(".n98-magerun.yaml")).unwrap();

        let loc = locator(Path::new(""), Some(home));
        assert!(loc.user_config_file().unwrap().is_none());
        assert!(loc.stop_file_config_file(&stop).unwrap().is_none());
    }
}
