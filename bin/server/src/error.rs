//! Error types for the server.
//!
//! Per-message failures never reach this module: the relay turns them into
//! events. What is left are wire-format problems, which are reported to the
//! client, and startup problems, which end the process.

use std::fmt;

/// Message shown to clients for frames that cannot be decoded.
pub const MALFORMED_MESSAGE: &str = "Malformed request";

/// Errors decoding inbound frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame is not a known client event.
    Malformed { reason: String },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { reason } => write!(f, "malformed client event: {reason}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Fatal errors while starting the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// A required setting is absent or blank.
    ConfigurationMissing { key: &'static str },
    /// A setting is present but unusable.
    ConfigurationInvalid { details: String },
    /// The completion backend could not be constructed.
    BackendInit { details: String },
    /// The listener could not bind.
    BindFailed { addr: String, details: String },
    /// The server stopped with an I/O error.
    ServeFailed { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationMissing { key } => {
                write!(f, "{key} environment variable not set")
            }
            Self::ConfigurationInvalid { details } => {
                write!(f, "invalid configuration: {details}")
            }
            Self::BackendInit { details } => {
                write!(f, "failed to initialize completion backend: {details}")
            }
            Self::BindFailed { addr, details } => {
                write!(f, "failed to bind {addr}: {details}")
            }
            Self::ServeFailed { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}
