//! Data models shared by the detection engine, the connection supervisor and
//! the notification sink.

pub mod alert;
pub mod chat_message;
pub mod protocol;
pub mod signal;

pub use alert::{AlertDecision, SuppressReason};
pub use chat_message::ChatMessage;
pub use protocol::{ChatPayload, Frame, SubscribePayload};
pub use signal::SignalMatch;
