//! `wschat history`: print a user's stored conversation.

use anyhow::{Context, Result};
use console::style;

use wschat_core::repository::MessageRepository;
use wschat_types::chat::{ChatMessage, MessageRole};
use wschat_types::session::SessionId;

use crate::state::AppState;

/// # Examples
///
/// ```bash
/// wschat history --user alice
/// wschat history --user alice --json
/// ```
pub async fn show_history(state: &AppState, user: &str, json: bool) -> Result<()> {
    let user_id = SessionId::new(user);
    if user_id.is_blank() {
        anyhow::bail!("a user id is required");
    }

    let messages = state
        .backend
        .list(&user_id)
        .await
        .with_context(|| format!("Failed to load history for '{user}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} No messages yet. Start chatting with: {}",
            style("i").blue().bold(),
            style(format!("wschat chat --user {user}")).yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    for message in &messages {
        println!("{}", format_message(message));
    }
    println!();
    Ok(())
}

/// One transcript line: time, role label, content, and the id (for `/delete`).
pub fn format_message(message: &ChatMessage) -> String {
    let label = match message.role {
        MessageRole::User => style("You").green().bold(),
        MessageRole::Assistant => style("AI ").cyan().bold(),
    };
    format!(
        "  {} {} {}  {}",
        style(message.created_at.format("%H:%M")).dim(),
        label,
        message.content,
        style(format!("[{}]", message.id)).dim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wschat_types::chat::MessageId;

    #[test]
    fn test_format_message_includes_id_and_role() {
        let message = ChatMessage {
            id: MessageId::from("m1"),
            user_id: SessionId::new("u1"),
            role: MessageRole::Assistant,
            content: "hello".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 9, 30, 0).unwrap(),
        };
        let line = console::strip_ansi_codes(&format_message(&message)).to_string();
        assert_eq!(line, "  09:30 AI  hello  [m1]");
    }
}
