//! A set of helpers for testing

mod config;
mod message;
mod notifier;
mod transport;

pub use config::AppConfigBuilder;
pub use message::ChatMessageBuilder;
pub use notifier::RecordingSink;
pub use transport::{ScriptedConnector, ScriptedTransport, ServerEvent, ServerHandle, chat_frame};
