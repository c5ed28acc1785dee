//! Frames of the `graphql-transport-ws` subscription protocol.
//!
//! Every frame is a JSON object with a `type` discriminator. Only the subset
//! the connection supervisor consumes or produces is modelled; unknown frame
//! types decode to [`Frame::Other`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ChatMessage;

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Client → server: opens the protocol session.
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Server → client: acknowledges `connection_init`.
    ConnectionAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Client → server: starts a subscription.
    Subscribe {
        id: String,
        payload: SubscribePayload,
    },
    /// Server → client: a subscription result.
    Next {
        #[serde(default)]
        id: String,
        #[serde(default)]
        payload: Value,
    },
    /// Server → client: the subscription failed.
    Error {
        #[serde(default)]
        id: String,
        #[serde(default)]
        payload: Value,
    },
    /// Either direction: the subscription finished.
    Complete {
        #[serde(default)]
        id: String,
    },
    /// Either direction: keepalive request.
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Either direction: keepalive response.
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Any frame type not listed above.
    #[serde(other)]
    Other,
}

/// Payload of a `subscribe` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribePayload {
    /// The GraphQL subscription document.
    pub query: String,
    /// Always an empty object for the chat stream.
    #[serde(default)]
    pub variables: serde_json::Map<String, Value>,
}

impl Frame {
    /// The `connection_init` frame.
    pub fn connection_init() -> Self {
        Frame::ConnectionInit { payload: None }
    }

    /// A `subscribe` frame with empty variables.
    pub fn subscribe(id: impl Into<String>, query: impl Into<String>) -> Self {
        Frame::Subscribe {
            id: id.into(),
            payload: SubscribePayload { query: query.into(), variables: Default::default() },
        }
    }

    /// A `ping` frame without payload.
    pub fn ping() -> Self {
        Frame::Ping { payload: None }
    }

    /// A `pong` frame without payload.
    pub fn pong() -> Self {
        Frame::Pong { payload: None }
    }

    /// Decodes a frame from its JSON text.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encodes the frame as JSON text.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The wire name of the frame type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::ConnectionInit { .. } => "connection_init",
            Frame::ConnectionAck { .. } => "connection_ack",
            Frame::Subscribe { .. } => "subscribe",
            Frame::Next { .. } => "next",
            Frame::Error { .. } => "error",
            Frame::Complete { .. } => "complete",
            Frame::Ping { .. } => "ping",
            Frame::Pong { .. } => "pong",
            Frame::Other => "other",
        }
    }
}

#[derive(Debug, Deserialize)]
struct NextPayload {
    #[serde(default)]
    data: Option<ChatData>,
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatData {
    #[serde(default)]
    chat_messages: Option<ChatMessageNode>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageNode {
    #[serde(default)]
    user: Option<ChatUser>,
    #[serde(default)]
    data: Option<ChatMessageData>,
}

#[derive(Debug, Deserialize)]
struct ChatUser {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageData {
    #[serde(default)]
    message: Option<String>,
}

/// Outcome of decoding the payload of a `next` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPayload {
    /// A text chat message.
    Message(ChatMessage),
    /// No chat data or an empty text, e.g. a non-text message type.
    Empty,
    /// The server reported GraphQL errors instead of data.
    Errors(String),
}

impl ChatPayload {
    /// Extracts the chat message from a `next` payload.
    ///
    /// A payload whose shape does not match the chat subscription at all is a
    /// decode error; missing optional parts are not.
    pub fn decode(payload: &Value, observed_at: DateTime<Utc>) -> Result<Self, serde_json::Error> {
        let payload = NextPayload::deserialize(payload)?;

        if let Some(errors) = payload.errors.filter(|e| !e.is_null()) {
            if payload.data.is_none() {
                return Ok(ChatPayload::Errors(errors.to_string()));
            }
            tracing::warn!(errors = %errors, "Chat payload carried errors alongside data.");
        }

        let Some(node) = payload.data.and_then(|d| d.chat_messages) else {
            return Ok(ChatPayload::Empty);
        };
        let text = node.data.and_then(|d| d.message).unwrap_or_default();
        if text.is_empty() {
            return Ok(ChatPayload::Empty);
        }
        let username = node.user.and_then(|u| u.name).unwrap_or_else(|| "Unknown".to_string());

        Ok(ChatPayload::Message(ChatMessage::new(username, text, observed_at)))
    }
}
