//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// statewatch: device state change recorder
///
/// Polls the state of a fixed set of controls on a home-automation device
/// and appends every observed change to a CSV log.
#[derive(Debug, Parser)]
#[command(name = "statewatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Base URL of the device (required for run mode)
    #[arg(long)]
    pub url: Option<String>,

    /// User name for HTTP Basic authentication
    #[arg(long)]
    pub user: Option<String>,

    /// Password for HTTP Basic authentication
    #[arg(long)]
    pub password: Option<String>,

    /// State endpoint path relative to the URL; `{id}` is replaced by the entity id
    #[arg(long = "state-path", value_name = "TEMPLATE")]
    pub state_path: Option<String>,

    /// Seconds between ticks
    #[arg(long)]
    pub interval: Option<u64>,

    /// Upper bound on a single state fetch, in seconds
    #[arg(long = "fetch-timeout")]
    pub fetch_timeout: Option<u64>,

    /// Log a progress summary every N ticks
    #[arg(long = "progress-every", value_name = "N")]
    pub progress_every: Option<u64>,

    /// Change log destination (default: monitor_YYYYMMDD_HHMMSS.csv)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Entity to monitor as 'ID' or 'ID=Display Name' (can be specified multiple times)
    #[arg(long = "entity", value_name = "SPEC")]
    pub entities: Vec<String>,

    /// Path to configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for statewatch
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "statewatch.toml")]
        output: PathBuf,
    },
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }
}
