//! Subscription transports: the abstract interface used by the connection
//! supervisor and its websocket implementation.

pub mod traits;
pub mod websocket;

pub use traits::{Connector, Transport, TransportError};
pub use websocket::{WebSocketConnector, WebSocketTransport};
