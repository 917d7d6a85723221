//! Error types for the AI crate.

use std::fmt;

/// Errors from completion backend operations.
///
/// Callers treat every variant the same way (the reply failed); the variants
/// exist so logs and apology messages say what actually went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The request never produced an HTTP response.
    RequestFailed { reason: String },
    /// The provider rejected the credential.
    Unauthorized { status: u16 },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// The provider answered with a non-success status.
    UpstreamStatus { status: u16, body: String },
    /// Timeout waiting for response.
    Timeout,
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::Unauthorized { status } => {
                write!(f, "LLM provider rejected credentials (HTTP {status})")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::UpstreamStatus { status, body } => {
                write!(f, "LLM provider returned HTTP {status}: {body}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}
