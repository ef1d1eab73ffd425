//! Slash command parsing for the chat loop.
//!
//! Commands start with `/`; anything else is sent as a message.

use console::style;
use wschat_types::chat::MessageId;

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Stop waiting for the current reply.
    Stop,
    /// Delete a message by id.
    Delete(MessageId),
    /// Reprint the conversation.
    History,
    /// End the chat session.
    Exit,
    /// Unknown or malformed command, with the text to show.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/stop" | "/cancel" => ChatCommand::Stop,
        "/history" => ChatCommand::History,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/delete" | "/del" | "/rm" => {
            if arg.is_empty() {
                ChatCommand::Unknown("/delete requires a message id".to_string())
            } else {
                ChatCommand::Delete(MessageId::from(arg))
            }
        }
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Help text listing all available commands.
pub fn help_text() -> String {
    let rows = [
        ("/help", "Show this help message"),
        ("/stop", "Stop waiting for the current reply"),
        ("/delete <id>", "Delete a message"),
        ("/history", "Show the conversation"),
        ("/exit", "End the chat session"),
    ];
    let mut text = format!("\n  {}\n\n", style("Available commands:").bold());
    for (cmd, desc) in rows {
        text.push_str(&format!("  {:<14} {}\n", style(cmd).cyan(), desc));
    }
    text.push_str(&format!(
        "\n  {}\n",
        style("Ctrl+C stops a pending reply, Ctrl+D exits").dim()
    ));
    text
}
