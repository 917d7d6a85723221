//! Per-connection session lifecycle.
//!
//! A [`Connection`] is transport-agnostic: it takes decoded lifecycle events
//! and text frames and produces [`ServerEvent`]s. The WebSocket loop in
//! [`crate::ws`] is the only thing that knows about sockets.

use crate::app::AppState;
use crate::error::MALFORMED_MESSAGE;
use crate::protocol::{ClientEvent, ServerEvent};
use playschool_conversation::{RelayOutcome, SessionError};
use playschool_core::{ConnectionId, SessionId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One open client connection and the session created for it.
pub struct Connection {
    id: ConnectionId,
    session_id: SessionId,
    state: Arc<AppState>,
}

impl Connection {
    /// Handles a new connection: creates its session and returns the events
    /// to send right away (session id, then greeting).
    pub async fn open(state: Arc<AppState>) -> (Self, Vec<ServerEvent>) {
        let id = ConnectionId::new();
        let session_id = state.store.create(&state.session.system_prompt).await;
        info!(connection_id = %id, session_id = %session_id, "client connected");

        // The greeting is a courtesy for the UI and stays out of the transcript.
        let events = vec![
            ServerEvent::SessionEstablished { session_id },
            ServerEvent::chat(state.session.greeting.as_str()),
        ];

        (
            Self {
                id,
                session_id,
                state,
            },
            events,
        )
    }

    /// The connection's id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The session created when this connection opened.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Handles one inbound text frame and returns the event to send back.
    ///
    /// Clients may address any live session, not only the one created for
    /// this connection, which is how a reconnecting client resumes.
    pub async fn handle_frame(&self, frame: &str) -> ServerEvent {
        let event = match ClientEvent::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "rejecting malformed frame");
                return ServerEvent::error(MALFORMED_MESSAGE);
            }
        };

        match event {
            ClientEvent::UserMessage {
                session_id,
                message,
            } => {
                let raw = session_id.unwrap_or_default();
                debug!(connection_id = %self.id, session_id = %raw, message_len = message.len(), "user message");
                self.respond(self.state.relay.relay(&raw, &message).await)
            }
        }
    }

    fn respond(&self, outcome: RelayOutcome) -> ServerEvent {
        match outcome {
            RelayOutcome::Completed { reply } => ServerEvent::chat(reply),
            RelayOutcome::Failed { apology, .. } => ServerEvent::chat(apology),
            RelayOutcome::Rejected { error } => {
                debug!(connection_id = %self.id, error = %error, "message rejected");
                ServerEvent::error(SessionError::CLIENT_MESSAGE)
            }
        }
    }

    /// Handles the connection closing.
    ///
    /// The session is kept for later reuse unless the server is configured
    /// to release it.
    pub async fn close(self) {
        if self.state.session.release_on_disconnect {
            self.state.store.remove(&self.session_id).await;
        }
        info!(
            connection_id = %self.id,
            session_id = %self.session_id,
            released = self.state.session.release_on_disconnect,
            "client disconnected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use playschool_ai::{LlmError, ScriptedBackend};
    use playschool_conversation::TurnRole;

    fn state_with(backend: Arc<ScriptedBackend>, session: SessionConfig) -> Arc<AppState> {
        Arc::new(AppState::new(backend, "llama-3.3-70b-versatile", session))
    }

    fn user_message(session_id: impl std::fmt::Display, message: &str) -> String {
        serde_json::json!({
            "event": "user_message",
            "data": {"session_id": session_id.to_string(), "message": message}
        })
        .to_string()
    }

    fn chat_text(event: &ServerEvent) -> &str {
        match event {
            ServerEvent::ChatMessage { message, .. } => message,
            other => panic!("expected chat message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_sends_session_then_greeting() {
        let state = state_with(Arc::new(ScriptedBackend::new()), SessionConfig::default());
        let (connection, events) = Connection::open(state.clone()).await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            ServerEvent::SessionEstablished {
                session_id: connection.session_id()
            }
        );
        assert!(chat_text(&events[1]).contains("Hello"));

        let transcript = state
            .store
            .get(&connection.session_id())
            .await
            .expect("transcript");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].role, TurnRole::System);
    }

    #[tokio::test]
    async fn two_connections_get_independent_sessions() {
        let state = state_with(Arc::new(ScriptedBackend::new()), SessionConfig::default());
        let (first, _) = Connection::open(state.clone()).await;
        let (second, _) = Connection::open(state.clone()).await;

        assert_ne!(first.session_id(), second.session_id());
        assert_ne!(first.id(), second.id());
        for id in [first.session_id(), second.session_id()] {
            assert_eq!(state.store.get(&id).await.expect("t").len(), 1);
        }
    }

    #[tokio::test]
    async fn reply_round_trip() {
        let backend = Arc::new(ScriptedBackend::new().reply("Hello! How can I help you?"));
        let state = state_with(backend.clone(), SessionConfig::default());
        let (connection, _) = Connection::open(state.clone()).await;
        let session_id = connection.session_id();

        let event = connection.handle_frame(&user_message(session_id, "Hi")).await;

        assert_eq!(chat_text(&event), "Hello! How can I help you?");
        let roles: Vec<_> = state
            .store
            .get(&session_id)
            .await
            .expect("t")
            .roles()
            .collect();
        assert_eq!(roles, [TurnRole::System, TurnRole::User, TurnRole::Assistant]);
    }

    #[tokio::test]
    async fn bogus_session_is_an_error_event() {
        let backend = Arc::new(ScriptedBackend::new().reply("unused"));
        let state = state_with(backend.clone(), SessionConfig::default());
        let (connection, _) = Connection::open(state.clone()).await;

        let event = connection.handle_frame(&user_message("bogus", "Hi")).await;
        assert_eq!(event, ServerEvent::error("Session not found"));

        let missing = r#"{"event":"user_message","data":{"message":"Hi"}}"#;
        assert_eq!(
            connection.handle_frame(missing).await,
            ServerEvent::error("Session not found")
        );

        assert_eq!(backend.call_count(), 0);
        assert_eq!(state.store.len().await, 1);
        assert_eq!(
            state
                .store
                .get(&connection.session_id())
                .await
                .expect("t")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn upstream_failure_is_an_apology() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .fail(LlmError::RequestFailed {
                    reason: "API Error".to_string(),
                })
                .reply("Recovered"),
        );
        let state = state_with(backend.clone(), SessionConfig::default());
        let (connection, _) = Connection::open(state.clone()).await;
        let session_id = connection.session_id();

        let event = connection.handle_frame(&user_message(session_id, "Hi")).await;
        let text = chat_text(&event);
        assert!(text.contains("Sorry, I encountered an error"));
        assert!(text.contains("API Error"));
        assert_eq!(state.store.get(&session_id).await.expect("t").len(), 2);

        let event = connection.handle_frame(&user_message(session_id, "Again")).await;
        assert_eq!(chat_text(&event), "Recovered");
        let contents: Vec<_> = backend.requests()[1]
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1], "Hi");
        assert_eq!(contents[2], "Again");
    }

    #[tokio::test]
    async fn malformed_frame_keeps_connection_usable() {
        let backend = Arc::new(ScriptedBackend::new().reply("still here"));
        let state = state_with(backend, SessionConfig::default());
        let (connection, _) = Connection::open(state).await;

        assert_eq!(
            connection.handle_frame("{not json").await,
            ServerEvent::error("Malformed request")
        );

        let event = connection
            .handle_frame(&user_message(connection.session_id(), "Hi"))
            .await;
        assert_eq!(chat_text(&event), "still here");
    }

    #[tokio::test]
    async fn close_keeps_session_by_default() {
        let state = state_with(Arc::new(ScriptedBackend::new()), SessionConfig::default());
        let (connection, _) = Connection::open(state.clone()).await;
        let session_id = connection.session_id();

        connection.close().await;
        assert!(state.store.exists(&session_id).await);
    }

    #[tokio::test]
    async fn close_releases_session_when_configured() {
        let session = SessionConfig {
            release_on_disconnect: true,
            ..SessionConfig::default()
        };
        let state = state_with(Arc::new(ScriptedBackend::new()), session);
        let (connection, _) = Connection::open(state.clone()).await;
        let session_id = connection.session_id();

        connection.close().await;
        assert!(!state.store.exists(&session_id).await);
    }

    #[tokio::test]
    async fn resumes_session_from_another_connection() {
        let backend = Arc::new(ScriptedBackend::new().reply("welcome back"));
        let state = state_with(backend.clone(), SessionConfig::default());
        let (first, _) = Connection::open(state.clone()).await;
        let original = first.session_id();
        first.close().await;

        let (second, _) = Connection::open(state.clone()).await;
        let event = second.handle_frame(&user_message(original, "Hi")).await;

        assert_eq!(chat_text(&event), "welcome back");
        assert_eq!(state.store.get(&original).await.expect("t").len(), 3);
    }
}
