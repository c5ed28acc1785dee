//! This module provides the retryable HTTP client used by the notification
//! sink.

mod client;

pub use client::{HttpClientError, create_notifier_http_client, create_retryable_http_client};
