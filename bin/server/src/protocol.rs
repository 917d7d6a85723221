//! Client-facing event protocol.
//!
//! Every WebSocket text frame carries one event:
//!
//! ```json
//! {"event": "user_message", "data": {"session_id": "sess_...", "message": "Hi"}}
//! ```

use crate::error::ProtocolError;
use playschool_core::{SessionId, display_timestamp};
use serde::{Deserialize, Serialize};

/// Events sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once, immediately after connect.
    SessionEstablished { session_id: SessionId },
    /// Greeting, reply, or apology.
    ChatMessage { message: String, timestamp: String },
    /// A rejected request.
    Error { message: String },
}

impl ServerEvent {
    /// A chat message stamped with the current local time.
    #[must_use]
    pub fn chat(message: impl Into<String>) -> Self {
        Self::ChatMessage {
            message: message.into(),
            timestamp: display_timestamp(),
        }
    }

    /// An error event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serializes to a text frame.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode server event");
            String::new()
        })
    }
}

/// Events sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// One user-submitted chat line.
    UserMessage {
        /// Missing and `null` are accepted here and rejected by the relay
        /// as an unknown session.
        #[serde(default)]
        session_id: Option<String>,
        message: String,
    },
}

impl ClientEvent {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if the frame is not valid JSON or
    /// not a known event.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(|e| ProtocolError::Malformed {
            reason: e.to_string(),
        })
    }
}
