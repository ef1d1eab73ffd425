//! wschat CLI entry point.
//!
//! Parses CLI arguments, initializes tracing and the backend, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,wschat=debug",
        _ => "trace",
    };
    wschat_observe::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    wschat_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Chat {
            user,
            memory,
            endpoint,
        } => {
            let state = AppState::init(memory).await?;
            cli::chat::loop_runner::run_chat_loop(&state, &user, endpoint, cli.quiet).await
        }
        Commands::History { user } => {
            let state = AppState::init(false).await?;
            cli::history::show_history(&state, &user, cli.json).await
        }
    }
}
