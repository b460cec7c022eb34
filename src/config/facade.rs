//! The configuration object the rest of the application depends on.

use super::loader::ConfigurationLoader;
use super::types::{CommandAlias, ConfigMapping, lookup, lookup_value, scalar_to_string};
use crate::error::{ConfigError, ConfigResult};
use serde_yaml::Value;
use std::path::Path;

/// Owns the resolved configuration and, once assigned, the loader that
/// produced it.
///
/// The loader is assigned exactly once, either at construction or through
/// [`Config::set_loader`]; assigning it again without [`Config::reinit`] is an
/// error.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Resolved tree, always a mapping once set
    config: Option<Value>,
    partial: Option<ConfigMapping>,
    loader: Option<ConfigurationLoader>,
}

impl Config {
    /// Create a config without a loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config owning `loader`.
    pub fn with_loader(loader: ConfigurationLoader) -> Self {
        Self {
            loader: Some(loader),
            ..Self::default()
        }
    }

    /// Assign the loader. Fails if one is already set.
    pub fn set_loader(&mut self, loader: ConfigurationLoader) -> ConfigResult<()> {
        if self.loader.is_some() {
            return Err(ConfigError::LoaderAlreadySet);
        }
        self.loader = Some(loader);
        Ok(())
    }

    pub fn loader(&self) -> ConfigResult<&ConfigurationLoader> {
        self.loader.as_ref().ok_or(ConfigError::NoLoader)
    }

    pub fn loader_mut(&mut self) -> ConfigResult<&mut ConfigurationLoader> {
        self.loader.as_mut().ok_or(ConfigError::NoLoader)
    }

    /// Drop the loader and every cached view so a fresh loader can be set.
    pub fn reinit(&mut self) {
        self.config = None;
        self.partial = None;
        self.loader = None;
    }

    /// Load the root-independent layers into the partial view.
    ///
    /// The partial view only serves early bootstrap queries such as
    /// [`Config::detect_sub_folders`]; it does not replace [`Config::load`].
    pub fn load_partial_config(&mut self, load_external: bool) -> ConfigResult<&ConfigMapping> {
        let partial = self.loader_mut()?.load_partial_config(load_external)?;
        Ok(self.partial.insert(partial))
    }

    /// Run stage two on the owned loader.
    pub fn load_stage_two(
        &mut self,
        project_root: &Path,
        load_external: bool,
        stop_file_folder: Option<&Path>,
    ) -> ConfigResult<()> {
        self.loader_mut()?
            .load_stage_two(project_root, load_external, stop_file_folder)
    }

    /// Take the resolved mapping from the loader. Stage two must have run.
    pub fn load(&mut self) -> ConfigResult<()> {
        let resolved = self.loader()?.to_mapping()?;
        self.config = Some(Value::Mapping(resolved));
        Ok(())
    }

    /// Replace the whole configuration.
    pub fn set_config(&mut self, config: ConfigMapping) {
        self.config = Some(Value::Mapping(config));
    }

    /// The whole configuration.
    pub fn get_config(&self) -> ConfigResult<&ConfigMapping> {
        self.config
            .as_ref()
            .and_then(Value::as_mapping)
            .ok_or(ConfigError::NotYetLoaded)
    }

    /// Value at a key path; `Ok(None)` when any segment is absent.
    ///
    /// An empty path yields the whole configuration as a `Value::Mapping`.
    pub fn get<S: AsRef<str>>(&self, keys: &[S]) -> ConfigResult<Option<&Value>> {
        let root = self.config.as_ref().ok_or(ConfigError::NotYetLoaded)?;
        Ok(lookup_value(root, keys))
    }

    /// The partial view, if it has been loaded.
    pub fn partial_config(&self) -> Option<&ConfigMapping> {
        self.partial.as_ref()
    }

    /// Folders below a candidate root that may contain the project
    /// (`detect.subFolders` of the partial view).
    pub fn detect_sub_folders(&self) -> Vec<String> {
        self.partial
            .as_ref()
            .and_then(|partial| lookup(partial, &["detect", "subFolders"]))
            .and_then(Value::as_sequence)
            .map(|folders| folders.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default()
    }

    /// Configuration block of one command (`commands.<name>`).
    pub fn command_config(&self, command: &str) -> ConfigResult<Option<&Value>> {
        self.get(&["commands", command])
    }

    /// Aliases declared under `commands.aliases`.
    ///
    /// Entries that are not single `alias: "command ..."` mappings are ignored.
    pub fn command_aliases(&self) -> ConfigResult<Vec<CommandAlias>> {
        let Some(Value::Sequence(entries)) = self.get(&["commands", "aliases"])? else {
            return Ok(Vec::new());
        };

        let aliases = entries
            .iter()
            .filter_map(Value::as_mapping)
            .filter_map(|entry| entry.iter().next())
            .filter_map(|(name, definition)| {
                let name = scalar_to_string(name)?;
                let definition = definition.as_str()?;
                CommandAlias::parse(&name, definition)
            })
            .collect();

        Ok(aliases)
    }

    /// Rewrite an argument vector whose first element is an alias.
    ///
    /// `["cf", "--quiet"]` with `cf: "cache:flush --reinit"` becomes
    /// `["cache:flush", "--reinit", "--quiet"]`. Other vectors are returned
    /// unchanged.
    pub fn expand_alias(&self, args: &[String]) -> ConfigResult<Vec<String>> {
        let Some(first) = args.first() else {
            return Ok(Vec::new());
        };

        let aliases = self.command_aliases()?;
        let Some(alias) = aliases.iter().find(|alias| &alias.name == first) else {
            return Ok(args.to_vec());
        };

        let mut expanded = Vec::with_capacity(args.len() + alias.params.len());
        expanded.push(alias.command.clone());
        expanded.extend(alias.params.iter().cloned());
        expanded.extend(args[1..].iter().cloned());
        Ok(expanded)
    }
}
