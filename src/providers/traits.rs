//! This module defines the interface of the subscription transport: a
//! message-oriented duplex channel carrying protocol frames as JSON text.

use async_trait::async_trait;
use thiserror::Error;

/// Custom error type for transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error from the websocket layer.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// The upgrade request could not be built from the configuration.
    #[error("Invalid connection request: {0}")]
    InvalidRequest(String),

    /// Establishing the connection took longer than allowed.
    #[error("Connection attempt timed out")]
    ConnectTimeout,

    /// A send did not complete in time.
    #[error("Send timed out")]
    SendTimeout,

    /// The transport was used after it had been closed.
    #[error("Transport already closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocket(Box::new(e))
    }
}

/// An open connection to the subscription service.
///
/// The connection is released when the value is dropped; `close` additionally
/// performs a graceful closing handshake.
#[async_trait]
pub trait Transport: Send {
    /// Sends one text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits for the next text frame. `Ok(None)` means the peer closed the
    /// connection.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Closes the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports to the subscription service.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a new connection.
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError>;
}
