//! logtriage -- command-line front end for the rule store and log source.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use logtriage_core::config::LogTriageConfig;
use logtriage_core::error::LogTriageError;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = commands::load_config(&cli.config).await;

    // Logging comes up even when the config is broken so the error itself
    // can be reported.
    let mut general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("warning: {e}");
    }
    logtriage_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "logtriage starting");

    match run(cli, loaded).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli, loaded: Result<LogTriageConfig, LogTriageError>) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
        Commands::Rules(args) => commands::rules::execute(args, &loaded?, &writer).await,
        Commands::Logs(args) => commands::logs::execute(args, &loaded?, &writer).await,
        Commands::Classify(args) => commands::classify::execute(args, &loaded?, &writer).await,
    }
}
