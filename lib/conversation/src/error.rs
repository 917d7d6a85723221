//! Error types for the conversation crate.

use playschool_core::SessionId;
use std::fmt;

/// Errors from session lookups.
///
/// Both variants mean the same thing to a client: there is no session to
/// talk to, and reconnecting will hand out a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Well-formed id with no live session behind it.
    NotFound { id: SessionId },
    /// The id was missing, empty, or not a session id at all.
    InvalidId { raw: String, reason: String },
}

impl SessionError {
    /// Message shown to clients for every variant.
    pub const CLIENT_MESSAGE: &'static str = "Session not found";
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "session not found: {id}"),
            Self::InvalidId { raw, reason } => {
                write!(f, "invalid session id '{raw}': {reason}")
            }
        }
    }
}

impl std::error::Error for SessionError {}
