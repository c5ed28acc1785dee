//! # Notification Sink
//!
//! Delivers rendered alert text to the external messaging channel. The sink
//! is independent of the detection engine: a failed delivery is reported to
//! the caller and logged, and never changes the alert state.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

pub mod error;
pub mod payload_builder;
mod telegram;

pub use error::NotificationError;
pub use telegram::TelegramNotifier;

/// Destination for rendered alerts.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one alert message.
    async fn deliver(&self, text: &str) -> Result<(), NotificationError>;
}
