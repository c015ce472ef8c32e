//! moodlesync CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use moodlesync_cli::cli::{Cli, Command, ConfigAction, SyncArgs};
use moodlesync_cli::commands;
use moodlesync_cli::config::ClientConfig;
use moodlesync_cli::error::ClientResult;
use moodlesync_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    init_tracing(tracing.with_format(cli.log_format))?;

    let config = ClientConfig::load(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Sync(args)) => commands::sync::run(&config, &args).await,
        None => commands::sync::run(&config, &SyncArgs::default()).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, cli.config.as_deref()),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(cli.config.as_deref()),
        },
    }
}
