//! Command-line interface for cfgsync
//!
//! Parses arguments with clap, loads configuration, installs logging and
//! dispatches to one module per command.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
mod output;

use crate::config::ConfigLoader;
use commands::{Session, config, init, remote, status, sync, watch};
pub use output::{Output, SpinnerProgress};

/// Verbosity level equivalent to `general.debug = true`
const DEBUG_VERBOSITY: u8 = 2;

/// cfgsync - keep a settings directory committed to git
#[derive(Parser)]
#[command(name = "cfgsync", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Settings repository to operate on, overrides repository.path
    #[arg(long, value_name = "DIR", global = true)]
    pub repository: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Commit pending settings changes now
    Sync(sync::SyncArgs),
    /// Show pending changes and the configured remote
    Status(status::StatusArgs),
    /// Inspect or change the remote repository
    Remote(remote::RemoteArgs),
    /// Create the settings repository
    Init(init::InitArgs),
    /// Sync on startup, then auto-commit periodically until interrupted
    Watch(watch::WatchArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let Some(command) = self.command else {
            Cli::command().print_help()?;
            return Ok(());
        };

        let config = ConfigLoader::load_with_custom_config(self.config.as_deref()).extract()?;

        let verbosity = if config.general.debug {
            self.verbose.max(DEBUG_VERBOSITY)
        } else {
            self.verbose
        };
        setup_logging(verbosity, self.quiet);
        tracing::debug!(custom_config = ?self.config, repository = ?self.repository, "configuration loaded");

        let session = Session::new(
            Output::new(verbosity > 0, self.quiet),
            config,
            self.repository,
        );

        match command {
            Commands::Sync(args) => sync::execute(args, &session).await,
            Commands::Status(args) => status::execute(args, &session).await,
            Commands::Remote(args) => remote::execute(args, &session).await,
            Commands::Init(args) => init::execute(args, &session).await,
            Commands::Watch(args) => watch::execute(args, &session).await,
            Commands::Config(args) => config::execute(args, &session).await,
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
