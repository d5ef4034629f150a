//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development. Every variable has a default,
//! so `from_env` also succeeds on an empty environment.

use std::time::Duration;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL for the auth/profile service.
    pub api_url: String,
    /// Base URL for the chat/studio service.
    pub chat_api_url: String,
    /// Spacing between studio poll attempts.
    pub studio_poll_interval: Duration,
    /// How many poll attempts before giving up on a generation.
    pub studio_poll_attempts: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure tests
    /// are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Service Base URLs ---
        let api_url = std::env::var("SOP_API_URL")
            .unwrap_or_else(|_| "https://sop-backend-1.onrender.com".to_string());
        let chat_api_url = std::env::var("SOP_CHAT_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());

        // --- Load Studio Poller Settings ---
        let poll_ms_str =
            std::env::var("SOP_STUDIO_POLL_MS").unwrap_or_else(|_| "2000".to_string());
        let poll_ms = poll_ms_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("SOP_STUDIO_POLL_MS".to_string(), e.to_string())
        })?;

        let poll_attempts_str =
            std::env::var("SOP_STUDIO_POLL_ATTEMPTS").unwrap_or_else(|_| "30".to_string());
        let studio_poll_attempts = poll_attempts_str.parse::<u32>().map_err(|e| {
            ConfigError::InvalidValue("SOP_STUDIO_POLL_ATTEMPTS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_url,
            chat_api_url,
            studio_poll_interval: Duration::from_millis(poll_ms),
            studio_poll_attempts,
        })
    }
}
