//! Error types for the notification sink.

use thiserror::Error;

use crate::http_client::HttpClientError;

/// Defines the possible errors that can occur while delivering an alert.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// An error related to invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The endpoint answered, but not with a success status.
    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    /// An error originating from building the HTTP client.
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] HttpClientError),

    /// An error from the underlying `reqwest` or `reqwest_middleware`
    /// libraries.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest_middleware::Error),
}
