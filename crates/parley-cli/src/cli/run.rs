//! The `run` daemon: inactivity sweeper plus an optional stdin message feed.

use std::sync::Arc;

use anyhow::Result;
use console::style;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use parley_core::pipeline::InboundMessage;

use crate::state::{AppState, Orchestrator};

/// One inbound message on the stdin feed.
#[derive(Debug, Deserialize)]
struct InboundLine {
    phone: String,
    #[serde(default)]
    name: String,
    text: String,
}

fn parse_line(line: &str) -> Result<InboundMessage, serde_json::Error> {
    let inbound: InboundLine = serde_json::from_str(line)?;
    Ok(InboundMessage::new(inbound.phone, inbound.name, inbound.text))
}

/// Run until Ctrl+C or SIGTERM.
///
/// The sweeper finishes its current tick and in-flight messages stop at the
/// next cancellation point before the pools are closed.
pub async fn run(state: &AppState, stdin: bool, json: bool) -> Result<()> {
    let orchestrator = if stdin {
        Some(Arc::new(state.orchestrator()?))
    } else {
        None
    };
    print_banner(state, stdin, json)?;

    let cancel = CancellationToken::new();
    let sweeper = state.sweeper();

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = shutdown_signal() => info!("Shutdown requested"),
                _ = cancel.cancelled() => {}
            }
            cancel.cancel();
        }
    };
    let feed = async {
        if let Some(orchestrator) = orchestrator {
            feed_stdin(orchestrator, cancel.clone()).await;
        }
    };

    tokio::join!(sweeper.run(cancel.clone()), feed, shutdown);

    let counters = state.counters.snapshot();
    info!(?counters, "Parley stopped");
    if json {
        println!("{}", serde_json::to_string_pretty(&counters)?);
    }
    Ok(())
}

fn print_banner(state: &AppState, stdin: bool, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&state.config)?);
        return Ok(());
    }
    let sweeper = &state.config.sweeper;
    println!();
    println!(
        "  {} Parley v{} running",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "  Data dir:   {}",
        style(state.data_dir.display()).dim()
    );
    println!(
        "  Sweeper:    every {}s, idle after {}s",
        style(sweeper.sweep_interval_secs).cyan(),
        style(sweeper.inactivity_threshold_secs).cyan()
    );
    println!(
        "  Ephemeral:  {:?} (pool {}, max age {}s)",
        state.config.ephemeral.backend,
        state.config.ephemeral.pool_size,
        state.config.ephemeral.max_connection_age_secs
    );
    println!("  Catalog:    {} entries", state.catalog.snapshot().len());
    if stdin {
        println!("  Inbound:    JSON lines on stdin");
    }
    println!("  {}", style("Press Ctrl+C to stop").dim());
    println!();
    Ok(())
}

/// Hand each stdin line to the orchestrator. Messages run concurrently; the
/// orchestrator serializes those of the same correspondent.
async fn feed_stdin(orchestrator: Arc<Orchestrator>, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Inbound stream closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read inbound stream");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let message = match parse_line(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable inbound line");
                continue;
            }
        };

        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let correspondent = message.correspondent_id.clone();
            if let Err(e) = orchestrator.handle(message, &cancel).await {
                warn!(correspondent = %correspondent, error = %e, "Inbound message failed");
            }
        });
        while tasks.try_join_next().is_some() {}
    }

    while tasks.join_next().await.is_some() {}
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
