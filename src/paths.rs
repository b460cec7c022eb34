//! Filesystem locations consulted by the configuration cascade.
//!
//! Everything the loader reads from disk is derived from a [`LoaderPaths`]:
//! - the dist config (bundled into the binary or next to the installation)
//! - the system config directory (`/etc` or `%WINDIR%`)
//! - the user's home directory
//! - the installation directory, used to locate a vendor folder
//! - OS-wide plugin module folders
//!
//! `discover` reads the process environment once; `with_dirs` takes explicit
//! locations so embedders and tests never depend on the real environment.

use std::path::{Component, Path, PathBuf};

/// Name of the tool; config basenames and plugin folders derive from it.
pub const DEFAULT_APP_NAME: &str = "n98-magerun";

/// File name of the dist config inside the installation directory.
pub const DIST_CONFIG_NAME: &str = "config.yaml";

/// Dist config compiled into packaged builds.
pub const BUNDLED_DIST_CONFIG: &str = include_str!("../config.yaml");

/// Where the mandatory baseline config comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistSource {
    /// Compiled into the binary
    Bundled,
    /// Read from a file on disk
    File(PathBuf),
}

impl std::fmt::Display for DistSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistSource::Bundled => write!(f, "<bundled>/{}", DIST_CONFIG_NAME),
            DistSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Paths for every layer of the cascade.
#[derive(Debug, Clone)]
pub struct LoaderPaths {
    /// Application name (e.g. `n98-magerun`)
    pub app_name: String,
    /// Source of the dist config
    pub dist: DistSource,
    /// Directory holding the system-wide config file
    pub system_dir: Option<PathBuf>,
    /// Home directory as reported by the platform (may not exist)
    pub home_dir: Option<PathBuf>,
    /// Installation directory, used to locate a vendor folder
    pub install_dir: Option<PathBuf>,
    /// OS-wide plugin module folders
    pub system_plugin_dirs: Vec<PathBuf>,
}

impl LoaderPaths {
    /// Discover paths from the environment.
    ///
    /// Packaged builds use the bundled dist config and the executable's
    /// directory as installation directory; source-tree builds read
    /// `config.yaml` from the crate root.
    pub fn discover(app_name: &str, packaged: bool) -> Self {
        let install_dir = if packaged {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        } else {
            Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")))
        };

        let dist = match (&install_dir, packaged) {
            (Some(dir), false) => DistSource::File(dir.join(DIST_CONFIG_NAME)),
            _ => DistSource::Bundled,
        };

        Self {
            app_name: app_name.to_string(),
            dist,
            system_dir: system_config_dir(),
            home_dir: home_dir(),
            install_dir,
            system_plugin_dirs: system_plugin_dirs(app_name),
        }
    }

    /// Create paths with explicit directories and no OS-wide plugin folders.
    pub fn with_dirs(
        app_name: &str,
        dist: DistSource,
        home_dir: Option<PathBuf>,
        system_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            app_name: app_name.to_string(),
            dist,
            system_dir,
            home_dir,
            install_dir: None,
            system_plugin_dirs: Vec::new(),
        }
    }

    /// Set the installation directory used for vendor probing.
    pub fn with_install_dir(mut self, install_dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(install_dir.into());
        self
    }

    /// Add OS-wide plugin module folders.
    pub fn with_system_plugin_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.system_plugin_dirs.extend(dirs);
        self
    }

    /// Basename of every optional config file (`n98-magerun.yaml`).
    pub fn config_file_name(&self) -> String {
        format!("{}.yaml", self.app_name)
    }

    /// Path of the system-wide config file.
    pub fn system_config_file(&self) -> Option<PathBuf> {
        self.system_dir
            .as_ref()
            .map(|dir| dir.join(self.config_file_name()))
    }

    /// Plugin module folders below the home directory.
    pub fn home_plugin_dirs(&self) -> Vec<PathBuf> {
        let Some(home) = self.home_dir.as_ref() else {
            return Vec::new();
        };

        let mut dirs = Vec::new();
        if cfg!(windows) {
            dirs.push(home.join(&self.app_name).join("modules"));
        }
        dirs.push(home.join(format!(".{}", self.app_name)).join("modules"));
        dirs
    }

    /// Plugin module folder inside a project (`{root}/lib/{name}/modules`).
    pub fn project_plugin_dir(&self, project_root: &Path) -> Option<PathBuf> {
        if project_root.as_os_str().is_empty() {
            return None;
        }
        Some(project_root.join("lib").join(&self.app_name).join("modules"))
    }

    /// Candidate vendor directories.
    ///
    /// A packaged build only looks in the `vendor` folder next to it. Other
    /// builds also try the layout of an installed dependency package
    /// (`vendor/<org>/<pkg>`).
    pub fn vendor_dir_candidates(&self, packaged: bool) -> Vec<PathBuf> {
        let Some(install) = self.install_dir.as_ref() else {
            return Vec::new();
        };

        let mut candidates = vec![install.join("vendor")];
        if !packaged {
            candidates.push(normalize_path_components(&install.join("..").join("..")));
        }
        candidates
    }

    /// First vendor candidate that is a directory. `None` skips the vendor scan.
    pub fn vendor_dir(&self, packaged: bool) -> Option<PathBuf> {
        self.vendor_dir_candidates(packaged)
            .into_iter()
            .find(|candidate| candidate.is_dir())
    }
}

/// Home directory as reported by the platform.
///
/// The environment variable wins (`USERPROFILE` on Windows, `HOME`
/// elsewhere) so that a reported-but-broken value is surfaced rather than
/// silently replaced.
pub fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    match std::env::var_os(var) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => dirs::home_dir(),
    }
}

fn system_config_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("WINDIR").map(PathBuf::from)
    } else {
        Some(PathBuf::from("/etc"))
    }
}

fn system_plugin_dirs(app_name: &str) -> Vec<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("WINDIR")
            .map(|windir| vec![PathBuf::from(windir).join(app_name).join("modules")])
            .unwrap_or_default()
    } else {
        vec![
            PathBuf::from("/usr/share").join(app_name).join("modules"),
            PathBuf::from("/usr/local/share").join(app_name).join("modules"),
        ]
    }
}

/// Normalize path components without requiring the file to exist.
/// Handles `.` and `..` components.
pub fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => components.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.push(Component::ParentDir);
                }
            }
            Component::Normal(name) => components.push(Component::Normal(name)),
        }
    }

    components.iter().collect()
}
