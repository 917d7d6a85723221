//! Chat completion primitives for playschool.
//!
//! This crate provides:
//!
//! - **Backend contract**: [`CompletionBackend`], the single call the relay
//!   makes to generate a reply from a transcript
//! - **OpenAI-compatible backend**: an HTTP implementation for any
//!   `/chat/completions` endpoint (Groq by default)

pub mod backend;
pub mod error;
pub mod openai;

pub use backend::{
    CompletionBackend, CompletionMessage, CompletionRequest, CompletionResponse, MessageRole,
    TokenUsage,
};
pub use error::LlmError;
pub use openai::{BackendConfig, OpenAiCompatibleBackend};

#[cfg(any(test, feature = "testing"))]
pub mod scripted;

#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedBackend;
