//! CLI definitions for magerun-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::{ConfigMapping, insert_path};
use crate::format::OutputFormat;
use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_yaml::Value;
use std::path::PathBuf;

/// Output format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatArg {
    /// YAML (default)
    #[default]
    Yaml,
    /// Pretty-printed JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Yaml => OutputFormat::Yaml,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Inspect the n98-magerun configuration cascade
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(long, global = true)]
    pub root_dir: Option<PathBuf>,

    /// Folder holding the stop file; its dotfile config overrides the project config
    #[arg(long, global = true)]
    pub stop_file_folder: Option<PathBuf>,

    /// Only load the dist config and runtime overrides
    #[arg(long, global = true)]
    pub skip_config: bool,

    /// Dist config file (default: the bundled config.yaml)
    #[arg(long, global = true)]
    pub dist: Option<PathBuf>,

    /// Runtime override applied on top of every layer, e.g. `-D commands.cache:list.format=json`
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", global = true)]
    pub defines: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Yaml, global = true)]
    pub format: FormatArg,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Build the initial layer from `--define` options.
    pub fn initial_overrides(&self) -> Result<ConfigMapping> {
        let mut initial = ConfigMapping::new();
        for define in &self.defines {
            let (keys, value) = parse_define(define)?;
            insert_path(&mut initial, &keys, value);
        }
        Ok(initial)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format.into()
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the resolved configuration or the value at a key path (default)
    Show(ShowArgs),

    /// List command aliases declared under `commands.aliases`
    Aliases,

    /// List the sub-folders searched when detecting a project root
    SubFolders,
}

impl Default for Command {
    fn default() -> Self {
        Command::Show(ShowArgs::default())
    }
}

/// Arguments for the show command.
#[derive(Args, Debug, Clone, Default)]
pub struct ShowArgs {
    /// Key path segments, e.g. `commands db:dump`
    pub keys: Vec<String>,

    /// Show the partial configuration available before the project root is known
    #[arg(long)]
    pub partial: bool,
}

/// Parse `a.b.c=value`. The value is read as YAML so numbers, booleans and
/// lists keep their type; anything unparsable stays a string.
pub fn parse_define(define: &str) -> Result<(Vec<String>, Value)> {
    let Some((path, raw)) = define.split_once('=') else {
        bail!("invalid define '{}': expected KEY=VALUE", define);
    };

    let keys: Vec<String> = path.split('.').map(str::to_string).collect();
    if keys.iter().any(|key| key.is_empty()) {
        bail!("invalid define '{}': empty key segment", define);
    }

    let value = match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Null) if !raw.trim().is_empty() && raw.trim() != "~" && raw.trim() != "null" => {
            Value::String(raw.to_string())
        }
        Ok(value) => value,
        Err(_) => Value::String(raw.to_string()),
    };

    Ok((keys, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_define_typed_values() {
        let (keys, value) = parse_define("application.check-root-user=false").unwrap();
        assert_eq!(keys, vec!["application", "check-root-user"]);
        assert_eq!(value, Value::Bool(false));

        let (_, value) = parse_define("a=42").unwrap();
        assert_eq!(value, Value::from(42));

        let (_, value) = parse_define("a=[x, y]").unwrap();
        assert!(value.is_sequence());
    }

    #[test]
    fn test_parse_define_string_fallback() {
        let (_, value) = parse_define("commands.db:dump.compression=gz").unwrap();
        assert_eq!(value, Value::from("gz"));

        let (_, value) = parse_define("a=[unterminated").unwrap();
        assert_eq!(value, Value::from("[unterminated"));
    }

    #[test]
    fn test_parse_define_rejects_malformed() {
        assert!(parse_define("no-equals-sign").is_err());
        assert!(parse_define("a..b=1").is_err());
        assert!(parse_define("=1").is_err());
    }

    #[test]
    fn test_initial_overrides_nest() {
        let cli = Cli::parse_from(["magerun-config", "-D", "a.b=1", "-D", "a.c=two", "show"]);
        let initial = cli.initial_overrides().unwrap();
        let expected: ConfigMapping = serde_yaml::from_str("a: {b: 1, c: two}").unwrap();
        assert_eq!(initial, expected);
    }

    #[test]
    fn test_default_command_is_show() {
        let cli = Cli::parse_from(["magerun-config"]);
        assert!(cli.command.is_none());
        assert!(matches!(Command::default(), Command::Show(ShowArgs { partial: false, .. })));
    }
}
