//! CLI command definitions for the `wschat` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod history;

use clap::{Parser, Subcommand};

/// Chat with an AI assistant over a live message feed.
#[derive(Parser)]
#[command(name = "wschat", version, about, long_about = None)]
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

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, hide = true, env = "WSCHAT_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session.
    Chat {
        /// User id to sign in as.
        #[arg(long, short = 'u', env = "WSCHAT_USER")]
        user: String,

        /// Keep messages in memory instead of the SQLite database.
        #[arg(long)]
        memory: bool,

        /// Completion endpoint URL (overrides config.toml).
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Print a user's stored conversation.
    History {
        /// User id whose messages to show.
        #[arg(long, short = 'u', env = "WSCHAT_USER")]
        user: String,
    },
}
