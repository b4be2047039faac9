//! Parley command-line entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, initializes storage and services, then dispatches
//! to the appropriate command handler or runs the sweeper daemon.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use parley_observe::tracing_setup::{LogSettings, init_tracing, shutdown_tracing, verbosity_filter};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&LogSettings {
        default_filter: verbosity_filter(cli.verbose, cli.quiet, cli.command.is_daemon()),
        format: cli.log_format,
        export_spans: cli.otel,
    })?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;
    let result = dispatch(&state, &cli).await;
    state.close().await;
    shutdown_tracing();
    result
}

async fn dispatch(state: &AppState, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Run { stdin } => cli::run::run(state, *stdin, cli.json).await,
        Commands::Sweep => cli::sweep::sweep(state, cli.json, cli.quiet).await,
        Commands::Ingest { phone, name, text } => {
            cli::ingest::ingest(state, phone, name, text, cli.json).await
        }
        Commands::Catalog { action } => cli::catalog::dispatch(state, action, cli.json).await,
        Commands::Session { action } => cli::session::dispatch(state, action, cli.json).await,
        Commands::Status => cli::status::status(state, cli.json).await,
        Commands::Completions { .. } => Ok(()),
    }
}
