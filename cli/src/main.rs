//! govlock: operator CLI for the governance timelocks.
//!
//! Each invocation opens the ledger from its data directory, performs one
//! verb as the configured actor and persists the result.

mod commands;
mod config;
mod resolve;
mod session;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use govlock_ledger::GenesisConfig;
use govlock_utils::{init_logging, parse_duration, LogFormat};

use crate::commands::Command;
use crate::config::CliConfig;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "govlock", version, about = "Governance timelock operator CLI")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, env = "GOVLOCK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Data directory for the ledger.
    #[arg(long, env = "GOVLOCK_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Account to act as: a 0x address or a label such as "techops".
    #[arg(long, env = "GOVLOCK_ACTOR", global = true)]
    actor: Option<String>,

    /// Shift the clock forward, e.g. "48h". For rehearsing a timelock
    /// against a scratch data directory.
    #[arg(long, value_parser = parse_duration, global = true)]
    advance: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "GOVLOCK_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "GOVLOCK_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::from_toml_file(path)?,
            None => CliConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(actor) = &self.actor {
            config.actor = actor.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format, &config.log_level).context("initialising logging")?;

    if let Command::Genesis = cli.command {
        print!("{}", GenesisConfig::preset().to_toml_string()?);
        return Ok(());
    }

    let session = Session::open(&config, cli.advance.unwrap_or(0))?;
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        actor = %config.actor,
        "session opened"
    );
    commands::run(cli.command, &session)
}
