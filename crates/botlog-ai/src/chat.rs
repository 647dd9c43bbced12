//! Chat completion for the authoring conversation.

use anyhow::Result;
use serde_json::json;

use botlog_canvas::{ChatMessage, Role};
use botlog_core::{BotlogConfig, BotlogError, BotlogResult};

use crate::client::{extract_text, GeminiClient};

/// The editorial persona for the authoring chat.
pub const EDITORIAL_SYSTEM_PROMPT: &str = "\
You are BotLog AI, a professional blog-writing partner.

Role:
- Editor: content structure, headlines, SEO.
- Creative director: fresh angles and original takes.
- Trend watcher: technology, design, web3, AI.

Response style:
- Structured output: headings, bullet lists, short paragraphs.
- Concrete, actionable suggestions.
- Markdown syntax, key points in **bold**.
- For long pieces, open with an outline.

Interaction:
- Ask for missing details, offer multiple options, keep the user focused
  on one topic, and push for original viewpoints.

Your goal is to help the user produce a high-quality blog article.";

/// Non-streaming chat adapter over the authoring model.
pub struct ChatClient {
    client: GeminiClient,
}

impl ChatClient {
    pub fn new(config: &BotlogConfig) -> Self {
        let gemini = &config.ai.gemini;
        Self {
            client: GeminiClient::new(&gemini.base_url, &gemini.model, &gemini.api_key_env),
        }
    }

    /// Send the conversation and return the assistant's reply text.
    pub fn send(&self, messages: &[ChatMessage]) -> BotlogResult<String> {
        self.send_inner(messages)
            .map_err(|err| BotlogError::analyze(err.to_string()))
    }

    fn send_inner(&self, messages: &[ChatMessage]) -> Result<String> {
        let contents = normalize_messages(messages);
        let body = json!({
            "systemInstruction": {"parts": [{"text": EDITORIAL_SYSTEM_PROMPT}]},
            "contents": contents,
        });
        let response = self.client.generate_content(&body)?;
        Ok(extract_text(&response)?.to_string())
    }
}

/// Map chat messages onto the wire roles, dropping empty ones.
fn normalize_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .filter(|m| !m.content.is_empty())
        .map(|m| {
            let role = match m.role {
                Role::Assistant => "model",
                // The system persona travels separately; a stray system
                // message is treated as user context.
                Role::User | Role::System => "user",
            };
            json!({"role": role, "parts": [{"text": m.content}]})
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_empty_and_maps_roles() {
        let messages = vec![
            ChatMessage::new(Role::User, "hello"),
            ChatMessage::new(Role::Assistant, ""),
            ChatMessage::new(Role::Assistant, "hi there"),
        ];
        let normalized = normalize_messages(&messages);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0]["role"], "user");
        assert_eq!(normalized[1]["role"], "model");
        assert_eq!(normalized[1]["parts"][0]["text"], "hi there");
    }
}
