//! Conversation sessions.
//!
//! A session owns the transcript that is sent upstream, verbatim, on every
//! completion request. The first turn is always the system instruction.

use crate::message::{Turn, TurnRole};
use chrono::{DateTime, Utc};
use playschool_ai::CompletionMessage;
use playschool_core::SessionId;
use serde::Serialize;

/// The ordered turns of one conversation.
///
/// Only constructible with a system turn in front, and only appendable, so
/// `turns()[0]` is always the system instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates a transcript holding only the system instruction.
    #[must_use]
    pub fn seeded(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
        }
    }

    /// Appends a turn at the end.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns in order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns, system turn included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if the transcript has no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Roles in order, mostly useful in assertions and logs.
    pub fn roles(&self) -> impl Iterator<Item = TurnRole> + '_ {
        self.turns.iter().map(|t| t.role)
    }

    /// The transcript as upstream context.
    #[must_use]
    pub fn to_completion_messages(&self) -> Vec<CompletionMessage> {
        self.turns.iter().map(CompletionMessage::from).collect()
    }
}

/// A conversation session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Turns sent upstream as context.
    pub transcript: Transcript,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When a turn was last appended.
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session seeded with the system instruction.
    #[must_use]
    pub fn new(id: SessionId, system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            transcript: Transcript::seeded(system_prompt),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Adds a turn to the transcript.
    pub fn add_turn(&mut self, turn: Turn) {
        self.transcript.push(turn);
        self.last_active_at = Utc::now();
    }

    /// Returns the number of turns.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.transcript.len()
    }

    /// Returns true if nothing was appended since `cutoff`.
    #[must_use]
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_active_at < cutoff
    }
}
