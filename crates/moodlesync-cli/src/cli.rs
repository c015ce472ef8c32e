//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use moodlesync_core::TracingOutputFormat;

/// moodlesync - Mirror Moodle assignment deadlines into Google Calendar
#[derive(Debug, Parser)]
#[command(name = "moodlesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(long, short, env = "MOODLESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format (pretty, compact, json)
    #[arg(long, default_value = "compact", value_parser = parse_log_format)]
    pub log_format: TracingOutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

fn parse_log_format(value: &str) -> Result<TracingOutputFormat, String> {
    value.parse().map_err(|e: moodlesync_core::TracingError| e.to_string())
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sync deadlines into the calendar (default)
    Sync(SyncArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options of the `sync` command.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct SyncArgs {
    /// Log in with this MoodleSession cookie instead of the credentials file
    #[arg(long, env = "MOODLESYNC_SESSION_ID")]
    pub session_id: Option<String>,

    /// Number of months to sync, starting with the current one
    #[arg(long)]
    pub months: Option<u32>,

    /// Only check that the site session works, without syncing
    #[arg(long)]
    pub check_session: bool,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump,

    /// Validate configuration and referenced files
    Validate,

    /// Show configuration file path
    Path,
}
