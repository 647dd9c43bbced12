use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::Canvas;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One chat turn in an authoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
        }
    }
}

/// An authoring session: the chat transcript plus the canvas snapshot it
/// produced. Persisted opportunistically on every content-affecting change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    pub canvas: Canvas,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            canvas: Canvas::new(),
        }
    }

    /// Session title: the first user message truncated to 50 characters, or
    /// a fixed fallback for untitled sessions.
    pub fn derive_title(&self) -> String {
        match self.messages.iter().find(|m| m.role == Role::User) {
            Some(first) => {
                let mut title: String = first.content.chars().take(50).collect();
                if first.content.chars().count() > 50 {
                    title.push_str("...");
                }
                title
            }
            None => "Untitled session".to_string(),
        }
    }

    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
        if self.title.is_empty() {
            self.title = self.derive_title();
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_first_user_message() {
        let mut session = Session::new();
        session.push_message(Role::Assistant, "Hi, what shall we write?");
        session.push_message(Role::User, "An article about mushroom foraging");
        assert_eq!(session.derive_title(), "An article about mushroom foraging");
    }

    #[test]
    fn test_title_truncates_long_messages() {
        let mut session = Session::new();
        session.push_message(Role::User, "x".repeat(80));
        let title = session.derive_title();
        assert_eq!(title.chars().count(), 53); // 50 + "..."
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_untitled_fallback() {
        let session = Session::new();
        assert_eq!(session.derive_title(), "Untitled session");
    }

    #[test]
    fn test_roundtrip_serialization() {
        let mut session = Session::new();
        session.push_message(Role::User, "hello");
        session.canvas.insert(None, "card text");
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.messages.len(), 1);
        assert_eq!(back.canvas.len(), 1);
    }
}
