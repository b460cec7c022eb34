//! Configuration loader with layer-based merging.
//!
//! Loads every layer of the cascade at most once, caches it for the lifetime
//! of the loader, and folds the layers in a fixed order:
//!
//! `dist → plugin → system → user → project (+ stop file) → initial`
//!
//! Loading happens in two stages. The partial load (dist, system, user) is
//! available before the project root is known; stage two adds the plugin and
//! project layers once it is.

use super::file::ConfigFile;
use super::locator::ConfigLocator;
use super::merge::{deep_merge, deep_merge_all};
use super::types::{ConfigLayer, ConfigMapping, lookup, scalar_to_string};
use crate::error::{ConfigError, ConfigResult};
use crate::paths::{BUNDLED_DIST_CONFIG, DistSource, LoaderPaths};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory depth (below the scanned folder) of vendor package configs: `vendor/<org>/<pkg>/`.
const VENDOR_SCAN_DEPTH: usize = 2;

/// Directory depth of config files in plugin module folders: `modules/<plugin>/`.
const MODULE_SCAN_DEPTH: usize = 1;

/// Loads and caches the configuration cascade.
#[derive(Debug, Clone)]
pub struct ConfigurationLoader {
    /// Locations of every layer
    paths: LoaderPaths,
    /// Caller-supplied overrides, merged last
    initial: ConfigMapping,
    /// Whether the tool runs from a packaged build; narrows vendor discovery
    packaged: bool,

    dist: Option<ConfigMapping>,
    plugin: Option<ConfigMapping>,
    system: Option<ConfigMapping>,
    user: Option<ConfigMapping>,
    project: Option<ConfigMapping>,

    /// Result of stage two
    resolved: Option<ConfigMapping>,
}

impl ConfigurationLoader {
    /// Create a loader.
    ///
    /// Fails with `MissingMandatorySource` when the dist config file does not
    /// exist. Its content is read lazily on first use.
    pub fn new(initial: ConfigMapping, packaged: bool, paths: LoaderPaths) -> ConfigResult<Self> {
        if let DistSource::File(ref path) = paths.dist
            && !path.is_file()
        {
            let display = path.to_string_lossy().into_owned();
            return Err(ConfigError::missing_dist(
                display.clone(),
                ConfigError::not_readable(display, None),
            ));
        }

        debug!(dist = %paths.dist, packaged, "Created configuration loader");

        Ok(Self {
            paths,
            initial,
            packaged,
            dist: None,
            plugin: None,
            system: None,
            user: None,
            project: None,
            resolved: None,
        })
    }

    /// Load the layers that do not depend on the project root.
    ///
    /// Merges dist, then system and user (with an empty project root) when
    /// `load_external` is set, then the initial overrides. Repeated calls reuse
    /// the cached layers.
    pub fn load_partial_config(&mut self, load_external: bool) -> ConfigResult<ConfigMapping> {
        let mut layers = vec![self.dist_config()?];

        if load_external {
            layers.push(self.system_config(Path::new(""))?);
            layers.push(self.user_config(Path::new(""))?);
        }

        layers.push(self.initial.clone());
        Ok(deep_merge_all(&layers))
    }

    /// Run the full cascade for a known project root and store the result.
    ///
    /// Without `load_external` only dist and the initial overrides are used.
    pub fn load_stage_two(
        &mut self,
        project_root: &Path,
        load_external: bool,
        stop_file_folder: Option<&Path>,
    ) -> ConfigResult<()> {
        let dist = self.dist_config()?;
        let mut layers = vec![dist];

        if load_external {
            let settings = deep_merge(&layers[0], &self.initial);
            layers.push(self.plugin_config(project_root, &settings)?);
            layers.push(self.system_config(project_root)?);
            layers.push(self.user_config(project_root)?);
            layers.push(self.project_config(project_root, stop_file_folder)?);
        }

        layers.push(self.initial.clone());
        self.resolved = Some(deep_merge_all(&layers));
        debug!(
            project_root = %project_root.display(),
            load_external,
            layers = layers.len(),
            "Resolved configuration"
        );
        Ok(())
    }

    /// The fully resolved configuration. Fails until stage two has run.
    pub fn to_mapping(&self) -> ConfigResult<ConfigMapping> {
        self.resolved.clone().ok_or(ConfigError::NotYetLoaded)
    }

    /// Whether stage two has completed.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Cached mapping of a single layer, if it has been loaded.
    ///
    /// The stop-file layer is folded into the project layer and the initial
    /// layer is always present.
    pub fn layer(&self, layer: ConfigLayer) -> Option<&ConfigMapping> {
        match layer {
            ConfigLayer::Dist => self.dist.as_ref(),
            ConfigLayer::Plugin => self.plugin.as_ref(),
            ConfigLayer::System => self.system.as_ref(),
            ConfigLayer::User => self.user.as_ref(),
            ConfigLayer::Project | ConfigLayer::StopFile => self.project.as_ref(),
            ConfigLayer::Initial => Some(&self.initial),
        }
    }

    pub fn paths(&self) -> &LoaderPaths {
        &self.paths
    }

    pub fn is_packaged(&self) -> bool {
        self.packaged
    }

    fn dist_config(&mut self) -> ConfigResult<ConfigMapping> {
        if let Some(ref dist) = self.dist {
            debug!("Load dist config (cached)");
            return Ok(dist.clone());
        }

        let file = match self.paths.dist {
            DistSource::Bundled => {
                ConfigFile::from_buffer(self.paths.dist.to_string(), BUNDLED_DIST_CONFIG)
            }
            DistSource::File(ref path) => ConfigFile::load(path)
                .map_err(|e| ConfigError::missing_dist(self.paths.dist.to_string(), e))?,
        };

        let dist = file
            .to_mapping()
            .map_err(|e| ConfigError::missing_dist(self.paths.dist.to_string(), e))?;

        debug!(path = %self.paths.dist, "Loaded dist config");
        self.dist = Some(dist.clone());
        Ok(dist)
    }

    fn system_config(&mut self, project_root: &Path) -> ConfigResult<ConfigMapping> {
        if let Some(ref system) = self.system {
            debug!("Load system config (cached)");
            return Ok(system.clone());
        }

        let mut system = ConfigMapping::new();
        if let Some(path) = self.paths.system_config_file()
            && path.is_file()
        {
            match ConfigFile::load(&path) {
                Ok(mut file) => {
                    file.apply_variables(&project_root.to_string_lossy(), None);
                    system = file.to_mapping()?;
                    debug!(path = %path.display(), "Loaded system config");
                }
                Err(e) if e.is_recoverable() => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable system config");
                }
                Err(e) => return Err(e),
            }
        }

        self.system = Some(system.clone());
        Ok(system)
    }

    fn user_config(&mut self, project_root: &Path) -> ConfigResult<ConfigMapping> {
        if let Some(ref user) = self.user {
            debug!("Load user config (cached)");
            return Ok(user.clone());
        }

        let locator = self.locator(project_root);
        let user = match locator.user_config_file()? {
            Some(file) => {
                let mapping = file.to_mapping()?;
                debug!(path = %file.path(), "Loaded user config");
                mapping
            }
            None => ConfigMapping::new(),
        };

        self.user = Some(user.clone());
        Ok(user)
    }

    /// Project config with the stop-file config merged on top.
    fn project_config(
        &mut self,
        project_root: &Path,
        stop_file_folder: Option<&Path>,
    ) -> ConfigResult<ConfigMapping> {
        if let Some(ref project) = self.project {
            debug!("Load project config (cached)");
            return Ok(project.clone());
        }

        let locator = self.locator(project_root);
        let mut project = ConfigMapping::new();

        if let Some(file) = locator.project_config_file()? {
            project = file.to_mapping()?;
            debug!(path = %file.path(), "Loaded project config");
        }

        if let Some(folder) = stop_file_folder
            && let Some(file) = locator.stop_file_config_file(folder)?
        {
            project = file.merge_into(&project)?;
            debug!(path = %file.path(), "Loaded stop-file config");
        }

        self.project = Some(project.clone());
        Ok(project)
    }

    /// Fold every plugin config file found in the module folders.
    ///
    /// `settings` (dist plus initial overrides) may list extra folders under
    /// `plugin.folders`.
    fn plugin_config(
        &mut self,
        project_root: &Path,
        settings: &ConfigMapping,
    ) -> ConfigResult<ConfigMapping> {
        if let Some(ref plugin) = self.plugin {
            debug!("Load plugin config (cached)");
            return Ok(plugin.clone());
        }

        let mut plugin = ConfigMapping::new();
        let mut scanned = HashSet::new();

        if let Some(vendor_dir) = self.paths.vendor_dir(self.packaged) {
            debug!(path = %vendor_dir.display(), "Vendor directory");
            plugin = self.scan_plugin_folders(
                plugin,
                project_root,
                &[vendor_dir],
                VENDOR_SCAN_DEPTH,
                &mut scanned,
            )?;
        }

        let module_folders = self.plugin_module_folders(project_root, settings);
        plugin = self.scan_plugin_folders(
            plugin,
            project_root,
            &module_folders,
            MODULE_SCAN_DEPTH,
            &mut scanned,
        )?;

        self.plugin = Some(plugin.clone());
        Ok(plugin)
    }

    /// Folders scanned at module depth, in scan order.
    fn plugin_module_folders(&self, project_root: &Path, settings: &ConfigMapping) -> Vec<PathBuf> {
        let mut folders = self.paths.system_plugin_dirs.clone();
        folders.extend(self.paths.home_plugin_dirs());
        folders.extend(self.paths.project_plugin_dir(project_root));

        let root = project_root.to_string_lossy();
        let configured = lookup(settings, &["plugin", "folders"]);
        if let Some(Value::Sequence(entries)) = configured {
            folders.extend(
                entries
                    .iter()
                    .filter_map(scalar_to_string)
                    .filter(|folder| !folder.is_empty())
                    .map(|folder| PathBuf::from(folder.replace("%root%", &root))),
            );
        }

        folders
    }

    fn scan_plugin_folders(
        &self,
        mut plugin: ConfigMapping,
        project_root: &Path,
        folders: &[PathBuf],
        depth: usize,
        scanned: &mut HashSet<PathBuf>,
    ) -> ConfigResult<ConfigMapping> {
        let file_name = self.paths.config_file_name();
        let root = project_root.to_string_lossy();

        for folder in folders {
            if !folder.is_dir() {
                continue;
            }
            let canonical = std::fs::canonicalize(folder).unwrap_or_else(|_| folder.clone());
            if !scanned.insert(canonical) {
                continue;
            }

            // Depth 0 is the folder itself, so files `depth` directories below it sit one deeper.
            let walker = WalkDir::new(folder)
                .min_depth(depth + 1)
                .max_depth(depth + 1)
                .follow_links(true)
                .sort_by_file_name();

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(
                            folder = %folder.display(),
                            error = %e,
                            "Skipping unreadable plugin path"
                        );
                        continue;
                    }
                };

                if !entry.file_type().is_file() || entry.file_name() != file_name.as_str() {
                    continue;
                }

                let path = entry.path();
                let mut file = match ConfigFile::load(path) {
                    Ok(file) => file,
                    Err(e) if e.is_recoverable() => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Skipping unreadable plugin config"
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                file.apply_variables(&root, path.parent());
                plugin = file.merge_into(&plugin)?;
                debug!(path = %path.display(), "Loaded plugin config");
            }
        }

        Ok(plugin)
    }

    fn locator(&self, project_root: &Path) -> ConfigLocator {
        ConfigLocator::new(self.paths.config_file_name(), project_root)
            .with_home_dir(self.paths.home_dir.clone())
    }
}
