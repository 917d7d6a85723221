//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys use
//! `__` as the separator, so `COMPLETION__MODEL` sets `completion.model`.

use crate::error::StartupError;
use playschool_ai::BackendConfig;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable holding the completion service credential.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Instruction seeded as the first turn of every session.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with a friendly and playful personality. Answer questions concisely and accurately.";

/// Greeting sent to every new connection.
pub const DEFAULT_GREETING: &str =
    "Hello there! I'm your friendly chatbot. How can I help you today? 😊";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Completion service credential. Required; checked by [`ServerConfig::load`].
    #[serde(default)]
    pub groq_api_key: Option<String>,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Upstream completion settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Upstream completion settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// OpenAI-compatible API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model every request is sent to.
    #[serde(default = "default_model")]
    pub model: String,

    /// Whole-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// First turn of every transcript.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Courtesy message sent on connect. Never part of the transcript.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Drop a connection's session when the socket closes.
    /// Off by default so a client can resume with its old id.
    #[serde(default)]
    pub release_on_disconnect: bool,

    /// Evict sessions idle for this long. Unset means sessions live as long
    /// as the process.
    #[serde(default)]
    pub idle_timeout_minutes: Option<u64>,

    /// Interval between idle sweeps, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_base_url() -> String {
    playschool_ai::openai::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            greeting: default_greeting(),
            release_on_disconnect: false,
            idle_timeout_minutes: None,
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl SessionConfig {
    /// Idle timeout as a duration, if eviction is enabled.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_minutes
            .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Sweep interval as a duration. Never zero.
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds.max(1))
    }
}

impl ServerConfig {
    /// Loads and validates configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or blank, or if any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, StartupError> {
        Self::load(config::Environment::default())
    }

    /// Loads and validates configuration from an environment source.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn load(environment: config::Environment) -> Result<Self, StartupError> {
        let config = config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| StartupError::ConfigurationInvalid {
                details: e.to_string(),
            })?;

        if config.api_key().is_none() {
            return Err(StartupError::ConfigurationMissing { key: API_KEY_VAR });
        }

        Ok(config)
    }

    /// The trimmed API key, if one is set.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.groq_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Backend settings derived from this configuration.
    #[must_use]
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::groq(self.api_key().unwrap_or_default())
            .with_base_url(self.completion.base_url.as_str())
            .with_timeout(Duration::from_secs(self.completion.timeout_secs))
    }
}
