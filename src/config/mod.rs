//! Configuration module for the burst detector.
//!
//! Settings come from an optional `app.yaml` overlaid with `SURGE__*`
//! environment variables. The notification credentials are read separately,
//! from the environment only.

mod app_config;
mod credentials;
mod helpers;
mod http_retry;

use thiserror::Error;

pub use app_config::AppConfig;
pub use credentials::{BOT_TOKEN_VAR, CHAT_ID_VAR, Credentials};
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, deserialize_keywords,
    deserialize_ws_url,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};

/// Errors raised while loading configuration. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required credential is absent from the environment.
    #[error("Missing required environment variable {0}")]
    MissingCredential(&'static str),

    /// The configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
