//! playschool WebSocket chat relay server.
//!
//! Clients connect to `/ws`, receive a session id and a greeting, and send
//! `user_message` events that are relayed to the completion backend.

pub mod app;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod ws;
