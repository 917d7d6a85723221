//! Conversation state for the playschool chat relay.
//!
//! This crate provides:
//!
//! - **Turns and transcripts**: the ordered, role-tagged context of a session
//! - **Session Store**: the shared `SessionId -> Session` map with
//!   per-session serialization
//! - **Message Relay**: one inbound user message in, one reply out, with
//!   upstream failures contained

pub mod error;
pub mod message;
pub mod relay;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use message::{Turn, TurnRole};
pub use relay::{APOLOGY_PREFIX, MessageRelay, RelayOutcome};
pub use session::{Session, Transcript};
pub use store::{SessionHandle, SessionStore};
