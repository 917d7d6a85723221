//! The message relay.
//!
//! Turns one inbound user message into one outbound reply. Per message:
//!
//! 1. Resolve the session id (`Rejected` if it is not live)
//! 2. Lock the session and append the user turn
//! 3. Send the whole transcript upstream and wait
//! 4. Append the assistant turn on success (`Completed`), or leave the
//!    transcript alone and produce an apology on failure (`Failed`)
//!
//! Nothing in here returns an error to the caller; every failure becomes a
//! [`RelayOutcome`] the connection layer can show to the user.

use crate::error::SessionError;
use crate::message::Turn;
use crate::store::SessionStore;
use playschool_ai::{CompletionBackend, CompletionRequest, LlmError};
use playschool_core::SessionId;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fixed start of every failure message shown to users.
pub const APOLOGY_PREFIX: &str = "Sorry, I encountered an error";

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The session id did not resolve; nothing was recorded.
    Rejected { error: SessionError },
    /// The reply was generated and recorded.
    Completed { reply: String },
    /// The upstream call failed; only the user turn was recorded.
    Failed { apology: String, error: LlmError },
}

impl RelayOutcome {
    /// Text to show as a chat message, if this outcome produces one.
    #[must_use]
    pub fn chat_text(&self) -> Option<&str> {
        match self {
            Self::Completed { reply } => Some(reply),
            Self::Failed { apology, .. } => Some(apology),
            Self::Rejected { .. } => None,
        }
    }
}

/// Builds the user-facing text for a failed completion.
#[must_use]
pub fn apology_for(error: &LlmError) -> String {
    format!("{APOLOGY_PREFIX}: {error}")
}

/// Relays user messages to the completion backend.
#[derive(Clone)]
pub struct MessageRelay {
    store: Arc<SessionStore>,
    backend: Arc<dyn CompletionBackend>,
    model: String,
}

impl MessageRelay {
    /// Creates a relay over a shared store and backend, pinned to one model.
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        backend: Arc<dyn CompletionBackend>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            model: model.into(),
        }
    }

    /// The store this relay mutates.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Processes one user message end to end.
    ///
    /// `raw_session_id` is whatever the client sent; empty or malformed ids
    /// are rejected the same way as unknown ones.
    pub async fn relay(&self, raw_session_id: &str, message: &str) -> RelayOutcome {
        let id = match raw_session_id.parse::<SessionId>() {
            Ok(id) => id,
            Err(e) => {
                debug!(raw_session_id, error = %e, "rejecting unparseable session id");
                return RelayOutcome::Rejected {
                    error: SessionError::InvalidId {
                        raw: raw_session_id.to_string(),
                        reason: e.reason,
                    },
                };
            }
        };

        let handle = match self.store.checkout(&id).await {
            Ok(handle) => handle,
            Err(error) => {
                debug!(session_id = %id, "rejecting message for unknown session");
                return RelayOutcome::Rejected { error };
            }
        };

        // Held until the reply is recorded so turns from two in-flight
        // messages can never interleave.
        let mut session = handle.lock().await;
        session.add_turn(Turn::user(message));

        let request = CompletionRequest::new(self.model.as_str())
            .with_messages(session.transcript.to_completion_messages());

        let started = Instant::now();
        let result = self.backend.complete(&request).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                session.add_turn(Turn::assistant(response.content.as_str()));
                info!(
                    session_id = %id,
                    backend = self.backend.name(),
                    model = %response.model,
                    turns = session.turn_count(),
                    latency_ms,
                    "reply generated"
                );
                RelayOutcome::Completed {
                    reply: response.content,
                }
            }
            Err(error) => {
                warn!(
                    session_id = %id,
                    backend = self.backend.name(),
                    turns = session.turn_count(),
                    latency_ms,
                    error = %error,
                    "completion failed"
                );
                RelayOutcome::Failed {
                    apology: apology_for(&error),
                    error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TurnRole;
    use playschool_ai::{MessageRole, ScriptedBackend};
    use std::time::Duration;

    const PROMPT: &str = "You are a helpful AI assistant.";
    const MODEL: &str = "llama-3.3-70b-versatile";

    fn relay_with(backend: Arc<ScriptedBackend>) -> MessageRelay {
        MessageRelay::new(Arc::new(SessionStore::new()), backend, MODEL)
    }

    fn roles_of(request: &CompletionRequest) -> Vec<MessageRole> {
        request.messages.iter().map(|m| m.role).collect()
    }

    #[tokio::test]
    async fn successful_reply_is_recorded() {
        let backend = Arc::new(ScriptedBackend::new().reply("Hello! How can I help you?"));
        let relay = relay_with(backend.clone());
        let id = relay.store().create(PROMPT).await;

        let outcome = relay.relay(&id.to_string(), "Hi").await;

        assert_eq!(
            outcome,
            RelayOutcome::Completed {
                reply: "Hello! How can I help you?".to_string()
            }
        );
        let transcript = relay.store().get(&id).await.expect("transcript");
        let roles: Vec<_> = transcript.roles().collect();
        assert_eq!(roles, [TurnRole::System, TurnRole::User, TurnRole::Assistant]);
        assert_eq!(transcript.turns()[1].content, "Hi");

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, MODEL);
        assert_eq!(roles_of(&requests[0]), [MessageRole::System, MessageRole::User]);
    }

    #[tokio::test]
    async fn unknown_session_is_rejected_without_side_effects() {
        let backend = Arc::new(ScriptedBackend::new().reply("unused"));
        let relay = relay_with(backend.clone());
        let live = relay.store().create(PROMPT).await;

        for raw in ["bogus", "", "   "] {
            let outcome = relay.relay(raw, "Hi").await;
            assert!(matches!(
                outcome,
                RelayOutcome::Rejected {
                    error: SessionError::InvalidId { .. }
                }
            ));
        }

        let missing = SessionId::new();
        let outcome = relay.relay(&missing.to_string(), "Hi").await;
        assert_eq!(
            outcome,
            RelayOutcome::Rejected {
                error: SessionError::NotFound { id: missing }
            }
        );
        assert_eq!(outcome.chat_text(), None);

        assert_eq!(backend.call_count(), 0);
        assert_eq!(relay.store().len().await, 1);
        assert_eq!(relay.store().get(&live).await.expect("live").len(), 1);
    }

    #[tokio::test]
    async fn failure_apologizes_and_keeps_transcript_clean() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .fail(LlmError::RequestFailed {
                    reason: "API Error".to_string(),
                })
                .reply("Back again!"),
        );
        let relay = relay_with(backend.clone());
        let id = relay.store().create(PROMPT).await;

        let outcome = relay.relay(&id.to_string(), "first").await;
        let text = outcome.chat_text().expect("apology text");
        assert!(text.starts_with(APOLOGY_PREFIX));
        assert!(text.contains("API Error"));

        let roles: Vec<_> = relay.store().get(&id).await.expect("t").roles().collect();
        assert_eq!(roles, [TurnRole::System, TurnRole::User]);

        let outcome = relay.relay(&id.to_string(), "second").await;
        assert_eq!(outcome.chat_text(), Some("Back again!"));

        let second = &backend.requests()[1];
        let contents: Vec<_> = second.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, [PROMPT, "first", "second"]);
    }

    #[tokio::test]
    async fn sequential_messages_build_full_context() {
        let backend = Arc::new(ScriptedBackend::new().reply("a1").reply("a2"));
        let relay = relay_with(backend.clone());
        let id = relay.store().create(PROMPT).await;

        relay.relay(&id.to_string(), "u1").await;
        relay.relay(&id.to_string(), "u2").await;

        let transcript = relay.store().get(&id).await.expect("transcript");
        let contents: Vec<_> = transcript.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, [PROMPT, "u1", "a1", "u2", "a2"]);

        let second = &backend.requests()[1];
        assert_eq!(second.messages.len(), 4);
        assert_eq!(
            roles_of(second),
            [
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_messages_on_one_session_are_serialized() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .reply("a1")
                .reply("a2")
                .with_delay(Duration::from_millis(50)),
        );
        let relay = relay_with(backend.clone());
        let id = relay.store().create(PROMPT).await.to_string();

        let (first, second) = tokio::join!(relay.relay(&id, "u1"), relay.relay(&id, "u2"));
        assert!(matches!(first, RelayOutcome::Completed { .. }));
        assert!(matches!(second, RelayOutcome::Completed { .. }));

        let lens: Vec<_> = backend.requests().iter().map(|r| r.messages.len()).collect();
        assert_eq!(lens, [2, 4]);

        let parsed: SessionId = id.parse().expect("id");
        let roles: Vec<_> = relay.store().get(&parsed).await.expect("t").roles().collect();
        assert_eq!(
            roles,
            [
                TurnRole::System,
                TurnRole::User,
                TurnRole::Assistant,
                TurnRole::User,
                TurnRole::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn sessions_do_not_share_context() {
        let backend = Arc::new(ScriptedBackend::new().reply("for a").reply("for b"));
        let relay = relay_with(backend.clone());
        let a = relay.store().create(PROMPT).await;
        let b = relay.store().create(PROMPT).await;

        relay.relay(&a.to_string(), "from a").await;
        relay.relay(&b.to_string(), "from b").await;

        let second = &backend.requests()[1];
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[1].content, "from b");
        assert_eq!(relay.store().get(&a).await.expect("a").len(), 3);
        assert_eq!(relay.store().get(&b).await.expect("b").len(), 3);
    }
}
