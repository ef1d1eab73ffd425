//! The interactive chat loop.
//!
//! Opens a chat engine for the user, then multiplexes three event sources:
//! readline input, view changes (new or removed messages, typing flag), and
//! engine notifications. Messages are only ever printed from the view, so
//! what the terminal shows is exactly what the engine admitted.

use std::collections::HashSet;
use std::fmt::Display;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rustyline_async::SharedWriter;
use tokio::sync::broadcast::error::RecvError;

use wschat_core::auth::SessionSlot;
use wschat_core::engine::{ChatEngine, ChatHandle};
use wschat_types::chat::{ChatMessage, MessageId};
use wschat_types::error::ChatError;
use wschat_types::notification::{ChatNotification, Severity};
use wschat_types::session::SessionId;

use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use crate::cli::history::format_message;
use crate::state::AppState;

/// Run an interactive session until `/exit`, Ctrl+D, or the engine stops.
pub async fn run_chat_loop(
    state: &AppState,
    user: &str,
    endpoint: Option<String>,
    quiet: bool,
) -> Result<()> {
    let user_id = SessionId::new(user);
    let sessions = SessionSlot::signed_in(user_id.clone());
    let completion = state.completion_client(endpoint)?;

    let handle = ChatEngine::new(
        state.backend.clone(),
        state.backend.clone(),
        completion,
        sessions.clone(),
    )
    .with_config(state.config.clone())
    .open()
    .await
    .context("Failed to open chat session")?;

    let mut printed: HashSet<MessageId> = HashSet::new();
    if !quiet {
        println!();
        println!(
            "  {} signed in as {}",
            style("wschat").cyan().bold(),
            style(handle.session()).green()
        );
        println!(
            "  {}",
            style(format!("Data: {}  |  /help for commands", state.data_dir.display())).dim()
        );
        println!();
    }
    for message in handle.messages().iter() {
        println!("{}", format_message(message));
        printed.insert(message.id.clone());
    }

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut input, mut out) = ChatInput::new(prompt).context("Failed to start line editor")?;

    let spinner = new_spinner(quiet);
    let result = drive(&handle, &mut input, &mut out, &spinner, &mut printed).await;
    spinner.finish_and_clear();
    input.flush();
    drop(out);

    let closed = handle.close().await;
    drop(sessions);
    result?;

    match closed {
        Ok(()) => {
            if !quiet {
                println!("\n  {}", style("Session ended.").dim());
            }
            Ok(())
        }
        Err(err) => Err(err).context("Chat session ended unexpectedly"),
    }
}

async fn drive(
    handle: &ChatHandle,
    input: &mut ChatInput,
    out: &mut SharedWriter,
    spinner: &ProgressBar,
    printed: &mut HashSet<MessageId>,
) -> Result<()> {
    let mut view_rx = handle.watch_view();
    let mut notes = handle.notifications();

    loop {
        tokio::select! {
            event = input.read_line() => match event {
                InputEvent::Eof => return Ok(()),
                InputEvent::Interrupted => {
                    if handle.is_typing() {
                        report(out, handle.cancel());
                    } else {
                        say(out, style("Press Ctrl+D to exit, or keep chatting.").dim());
                    }
                }
                InputEvent::Line(line) if line.is_empty() => {}
                InputEvent::Line(line) => match commands::parse(&line) {
                    Some(ChatCommand::Help) => say(out, commands::help_text()),
                    Some(ChatCommand::Stop) => report(out, handle.cancel()),
                    Some(ChatCommand::Delete(id)) => report(out, handle.delete(id)),
                    Some(ChatCommand::History) => {
                        for message in handle.messages().iter() {
                            say(out, format_message(message));
                        }
                    }
                    Some(ChatCommand::Exit) => return Ok(()),
                    Some(ChatCommand::Unknown(cmd)) => say(
                        out,
                        format!(
                            "  {} Unknown command: {}. Type /help for available commands.",
                            style("?").yellow().bold(),
                            style(cmd).dim()
                        ),
                    ),
                    None => report(out, handle.send(&line)),
                },
            },
            changed = view_rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let view = view_rx.borrow_and_update().clone();
                for message in unprinted(printed, &view.messages) {
                    spinner.suspend(|| say(out, format_message(message)));
                }
                if view.typing && spinner.is_finished() {
                    spinner.reset();
                    spinner.enable_steady_tick(Duration::from_millis(80));
                } else if !view.typing && !spinner.is_finished() {
                    spinner.finish_and_clear();
                }
            }
            note = notes.recv() => match note {
                Ok(note) => spinner.suspend(|| render_notification(out, &note)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Notification receiver lagged");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// Messages of `shown` not printed yet, marking them printed.
///
/// When the view shrank, the printed set is rebuilt from it first so a
/// removed id is forgotten.
fn unprinted<'a>(
    printed: &mut HashSet<MessageId>,
    shown: &'a [ChatMessage],
) -> Vec<&'a ChatMessage> {
    if shown.len() < printed.len() {
        *printed = shown.iter().map(|m| m.id.clone()).collect();
    }
    shown
        .iter()
        .filter(|m| printed.insert(m.id.clone()))
        .collect()
}

fn new_spinner(quiet: bool) -> ProgressBar {
    let spinner = if quiet {
        ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message("thinking...");
    // Starts finished; shown only while a reply is pending.
    spinner.finish_and_clear();
    spinner
}

fn say(out: &mut SharedWriter, line: impl Display) {
    let _ = writeln!(out, "{line}");
}

fn report(out: &mut SharedWriter, result: Result<(), ChatError>) {
    if let Err(err) = result {
        say(out, format!("  {} {err}", style("!").red().bold()));
    }
}

fn render_notification(out: &mut SharedWriter, note: &ChatNotification) {
    let line = match note {
        // The reply itself is printed from the view.
        ChatNotification::AssistantReplied { .. } => return,
        ChatNotification::MessageDeleted { id } => {
            format!("{} [{id}]", note.title())
        }
        ChatNotification::Failed(err) => {
            tracing::debug!(error = %err, "Chat operation failed");
            match err {
                ChatError::Persist(detail) | ChatError::Completion(detail) => {
                    format!("{} ({detail})", note.title())
                }
                _ => note.title(),
            }
        }
        _ => note.title(),
    };
    let icon = match note.severity() {
        Severity::Success => style("*").cyan().bold(),
        Severity::Info => style("i").blue().bold(),
        Severity::Error => style("!").red().bold(),
    };
    say(out, format!("  {icon} {line}"));
}
