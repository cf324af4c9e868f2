//! Command-line interface and config loading.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use qm_domain::config::Config;

#[derive(Parser)]
#[command(name = "quietmind", about = "Guided journaling chatbot gateway")]
pub struct Cli {
    /// Path to the config file (default: `$QM_CONFIG` or `./quietmind.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP gateway (the default when no subcommand is given).
    Serve,
    /// Inspect or validate the configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the version.
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Check the config file for problems and exit non-zero on errors.
    Validate,
    /// Print the effective configuration (defaults applied).
    Show,
}

/// Load the config from the given path, `$QM_CONFIG`, or `./quietmind.toml`.
/// A missing file yields the built-in defaults.
pub fn load_config(override_path: Option<&Path>) -> anyhow::Result<(Config, String)> {
    let path: PathBuf = match override_path {
        Some(p) => p.to_path_buf(),
        None => std::env::var("QM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./quietmind.toml")),
    };

    if !path.exists() {
        return Ok((Config::default(), format!("{} (not found, defaults)", path.display())));
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok((config, path.display().to_string()))
}

/// Validate the effective config; returns false when any check fails.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let mut ok = true;

    if config.server.port == 0 {
        eprintln!("error: [server].port must be non-zero");
        ok = false;
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        eprintln!("error: [llm].temperature must be within 0.0..=2.0");
        ok = false;
    }
    if config.llm.max_output_tokens == 0 {
        eprintln!("error: [llm].max_output_tokens must be non-zero");
        ok = false;
    }
    if config.llm.base_url.is_empty() {
        eprintln!("error: [llm].base_url must not be empty");
        ok = false;
    }

    if ok {
        println!("config ok ({config_path})");
    }
    ok
}

/// Print the effective configuration as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("error: rendering config: {e}"),
    }
}
