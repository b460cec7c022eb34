//! Layered configuration cascade.
//!
//! Merges configuration from a fixed sequence of layers, lowest priority first:
//! 1. **Dist** - `config.yaml` shipped with the tool (mandatory)
//! 2. **Plugin** - `n98-magerun.yaml` files in plugin module and vendor folders
//! 3. **System** - `/etc/n98-magerun.yaml` (`%WINDIR%` on Windows)
//! 4. **User** - `~/.n98-magerun.yaml`
//! 5. **Project** - `{root}/app/etc/n98-magerun.yaml`, then `.n98-magerun.yaml`
//!    in the stop-file folder on top of it
//! 6. **Initial** - overrides supplied by the caller
//!
//! ## Merge Strategy
//! - Mappings merge key by key, scalars are overridden
//! - Sequences and integer-keyed entries are appended
//!
//! ## Variables
//! - `%root%` - the project root (empty before it is known)
//! - `%module%` - the directory of the plugin file being loaded

mod facade;
mod file;
mod loader;
mod locator;
mod merge;
mod types;

pub use facade::Config;
pub use file::{ConfigFile, DATA_URI_PREFIX, MODULE_TOKEN, ROOT_TOKEN};
pub use loader::ConfigurationLoader;
pub use locator::ConfigLocator;
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
