//! magerun-config
//!
//! Runs the n98-magerun configuration cascade for a project and prints the
//! resolved configuration.

use anyhow::{Result, bail};
use clap::Parser;
use magerun_config::cli::{Cli, Command, ShowArgs};
use magerun_config::config::{Config, ConfigurationLoader, lookup_value};
use magerun_config::error::ConfigError;
use magerun_config::format::{OutputFormat, format_error, format_value};
use magerun_config::paths::{DEFAULT_APP_NAME, DistSource, LoaderPaths};
use serde_yaml::Value;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let format = cli.output_format();
    match run(&cli, format) {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast::<ConfigError>() {
            Ok(config_err) => {
                eprintln!("{}", format_error(&config_err, format));
                std::process::exit(1);
            }
            Err(e) => Err(e),
        },
    }
}

/// Initialize logging based on the --log option. `RUST_LOG` wins when set.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn run(cli: &Cli, format: OutputFormat) -> Result<()> {
    let mut paths = LoaderPaths::discover(DEFAULT_APP_NAME, true);
    if let Some(ref dist) = cli.dist {
        paths.dist = DistSource::File(dist.clone());
    }

    let loader = ConfigurationLoader::new(cli.initial_overrides()?, true, paths)?;
    let mut config = Config::with_loader(loader);
    let load_external = !cli.skip_config;

    match cli.command.clone().unwrap_or_default() {
        Command::Show(ShowArgs { keys, partial: true }) => {
            let partial = Value::Mapping(config.load_partial_config(load_external)?.clone());
            let value = select(lookup_value(&partial, &keys), &keys)?;
            print!("{}", format_value(&value, format)?);
        }
        Command::Show(ShowArgs { keys, partial: false }) => {
            load_full(&mut config, cli, load_external)?;
            let value = select(config.get(&keys)?, &keys)?;
            print!("{}", format_value(&value, format)?);
        }
        Command::Aliases => {
            load_full(&mut config, cli, load_external)?;
            let aliases = serde_yaml::to_value(config.command_aliases()?)?;
            print!("{}", format_value(&aliases, format)?);
        }
        Command::SubFolders => {
            config.load_partial_config(load_external)?;
            let folders = serde_yaml::to_value(config.detect_sub_folders())?;
            print!("{}", format_value(&folders, format)?);
        }
    }

    Ok(())
}

fn load_full(config: &mut Config, cli: &Cli, load_external: bool) -> Result<()> {
    let root = match cli.root_dir {
        Some(ref root) => root.clone(),
        None => std::env::current_dir()?,
    };

    debug!(root = %root.display(), load_external, "Loading configuration");
    config.load_stage_two(&root, load_external, cli.stop_file_folder.as_deref())?;
    config.load()?;
    Ok(())
}

fn select(value: Option<&Value>, keys: &[String]) -> Result<Value> {
    match value {
        Some(value) => Ok(value.clone()),
        None => bail!("no configuration value at '{}'", keys.join(" ")),
    }
}
