//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing. Resource commands follow a
//! noun-verb pattern (e.g., `parley catalog reload`, `parley session show`).

pub mod catalog;
pub mod ingest;
pub mod run;
pub mod session;
pub mod status;
pub mod sweep;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use parley_observe::tracing_setup::LogFormat;

/// Conversational session and interest lifecycle service.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log event format on stderr: pretty or json.
    #[arg(long, global = true, env = "PARLEY_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Export trace spans to stdout via OpenTelemetry.
    #[arg(long, global = true, env = "PARLEY_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the inactivity sweeper until Ctrl+C or SIGTERM.
    Run {
        /// Also read inbound messages as JSON lines from stdin.
        #[arg(long)]
        stdin: bool,
    },

    /// Run a single sweep tick and print the report.
    Sweep,

    /// Push one inbound message through the interaction workflow.
    Ingest {
        /// Correspondent phone number.
        #[arg(long)]
        phone: String,

        /// Correspondent display name.
        #[arg(long, default_value = "")]
        name: String,

        /// Message text.
        text: String,
    },

    /// Manage the interest reference catalog.
    Catalog {
        #[command(subcommand)]
        action: catalog::CatalogCommand,
    },

    /// Inspect active sessions.
    Session {
        #[command(subcommand)]
        action: session::SessionCommand,
    },

    /// Active session and archive counts.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Commands {
    /// Long-running commands log at info by default.
    pub fn is_daemon(&self) -> bool {
        matches!(self, Commands::Run { .. })
    }
}
