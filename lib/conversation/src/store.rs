//! The shared session store.
//!
//! The map is guarded by one `RwLock` that is only held long enough to
//! insert, look up, or remove an entry. Each session sits behind its own
//! async `Mutex`, so a slow completion call for one session blocks that
//! session and nothing else.

use crate::error::SessionError;
use crate::message::Turn;
use crate::session::{Session, Transcript};
use chrono::{DateTime, Utc};
use playschool_core::SessionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;

/// A cloneable reference to one live session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Returns true while a checked-out clone of this handle is alive.
    fn is_checked_out(&self) -> bool {
        Arc::strong_count(&self.inner) > 1
    }

    /// Waits for exclusive access to the session.
    ///
    /// Holding the guard serializes every read-modify-write on this
    /// session, including across an awaited completion call.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().await
    }
}

/// Process-wide mapping from session id to session.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session seeded with `system_prompt` and returns its id.
    pub async fn create(&self, system_prompt: &str) -> SessionId {
        let mut sessions = self.sessions.write().await;

        let mut id = SessionId::new();
        while sessions.contains_key(&id) {
            id = SessionId::new();
        }

        sessions.insert(id, SessionHandle::new(Session::new(id, system_prompt)));
        debug!(session_id = %id, live_sessions = sessions.len(), "session created");
        id
    }

    /// Returns true if the session exists.
    pub async fn exists(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Returns a handle to the session for a locked read-modify-write.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if the id is not live.
    pub async fn checkout(&self, id: &SessionId) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(SessionError::NotFound { id: *id })
    }

    /// Appends a turn to the end of the session's transcript.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if the id is not live.
    pub async fn append(&self, id: &SessionId, turn: Turn) -> Result<(), SessionError> {
        let handle = self.checkout(id).await?;
        handle.lock().await.add_turn(turn);
        Ok(())
    }

    /// Returns a copy of the session's full transcript.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if the id is not live.
    pub async fn get(&self, id: &SessionId) -> Result<Transcript, SessionError> {
        let handle = self.checkout(id).await?;
        let session = handle.lock().await;
        Ok(session.transcript.clone())
    }

    /// Removes the session. Returns whether anything was removed.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "session removed");
        }
        removed
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if there are no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Removes sessions with no activity since `cutoff`.
    ///
    /// Sessions that are checked out or locked are mid-request and never
    /// idle, so they are kept without waiting for the lock.
    pub async fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, handle| {
            if handle.is_checked_out() {
                return true;
            }
            match handle.inner.try_lock() {
                Ok(session) if session.is_idle_since(cutoff) => {
                    debug!(
                        session_id = %id,
                        created_at = %session.created_at,
                        last_active_at = %session.last_active_at,
                        "evicting idle session"
                    );
                    false
                }
                _ => true,
            }
        });

        before - sessions.len()
    }
}
