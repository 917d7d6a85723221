//! Core domain types and utilities for the playschool chat relay.
//!
//! This crate provides the foundational identifiers, the display clock, and
//! the error handling alias shared by the library crates and the server.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{display_timestamp, format_timestamp};
pub use error::Result;
pub use id::{ConnectionId, ParseIdError, SessionId};
