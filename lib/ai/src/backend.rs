//! Completion backend abstraction.
//!
//! The relay only ever needs one thing from a language model: given the
//! ordered conversation so far, produce the next assistant reply.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction.
    System,
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

/// One message of the context sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl CompletionMessage {
    /// Creates a message with the given role.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A chat completion request.
///
/// Serializes to the body shape every OpenAI-compatible endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Full ordered context.
    pub messages: Vec<CompletionMessage>,
}

impl CompletionRequest {
    /// Creates an empty request for a model.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
        }
    }

    /// Replaces the context messages.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<CompletionMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Appends one context message.
    #[must_use]
    pub fn with_message(mut self, message: CompletionMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// A generated reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Text of the top candidate.
    pub content: String,
    /// Model that generated the response.
    pub model: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Creates a response with no usage statistics.
    #[must_use]
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: TokenUsage::default(),
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns the total number of tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Trait for completion backends.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generates the next reply for the given context.
    ///
    /// # Errors
    ///
    /// Returns an error for any transport, auth, rate-limit, or decoding
    /// failure. Implementations must not panic on bad upstream data.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Short name used in log fields.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_keeps_order() {
        let request = CompletionRequest::new("llama-3.3-70b-versatile")
            .with_message(CompletionMessage::system("Be nice."))
            .with_message(CompletionMessage::user("Hi"))
            .with_message(CompletionMessage::assistant("Hello!"));

        let roles: Vec<_> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
    }

    #[test]
    fn request_wire_shape() {
        let request = CompletionRequest::new("m").with_messages(vec![CompletionMessage::user("Hi")]);
        let json = serde_json::to_value(&request).expect("serialize");

        assert_eq!(
            json,
            serde_json::json!({
                "model": "m",
                "messages": [{"role": "user", "content": "Hi"}]
            })
        );
    }

    #[test]
    fn token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }
}
