//! Turn types for conversations.

use playschool_ai::{CompletionMessage, MessageRole};
use serde::{Deserialize, Serialize};

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Fixed instruction seeded at session creation.
    System,
    /// User/human message.
    User,
    /// Generated reply.
    Assistant,
}

impl From<TurnRole> for MessageRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::System => MessageRole::System,
            TurnRole::User => MessageRole::User,
            TurnRole::Assistant => MessageRole::Assistant,
        }
    }
}

/// One role-tagged utterance in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it.
    pub role: TurnRole,
    /// What was said.
    pub content: String,
}

impl Turn {
    /// Creates a new turn.
    #[must_use]
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system turn.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

impl From<&Turn> for CompletionMessage {
    fn from(turn: &Turn) -> Self {
        CompletionMessage::new(turn.role.into(), turn.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_creation() {
        let turn = Turn::user("Hello!");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "Hello!");
    }

    #[test]
    fn converts_to_completion_message() {
        let message = CompletionMessage::from(&Turn::assistant("Hi there"));
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content, "Hi there");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::system("x")).expect("serialize");
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }
}
