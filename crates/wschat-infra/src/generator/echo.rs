//! Offline generator: answers with the user's own turn.

use wschat_core::reply::ReplyGenerator;
use wschat_types::error::CompletionError;

#[derive(Debug, Clone, Default)]
pub struct EchoGenerator;

impl ReplyGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        // The user's text follows the last "User: " marker of the prompt.
        let turn = prompt
            .rsplit_once("User: ")
            .map_or(prompt, |(_, turn)| turn)
            .trim();
        if turn.is_empty() {
            return Err(CompletionError::Generation("nothing to echo".to_string()));
        }
        Ok(format!("You said: {turn}"))
    }
}
