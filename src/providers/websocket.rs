//! WebSocket transport built on `tokio-tungstenite`.
//!
//! Websocket-level ping/pong is answered by the library while reading; only
//! text (and UTF-8 binary) messages are surfaced as frames.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        self, Message,
        client::IntoClientRequest,
        handshake::client::Request,
        http::{HeaderValue, header},
    },
};
use url::Url;

use super::traits::{Connector, Transport, TransportError};
use crate::config::AppConfig;

/// Opens websocket connections with the configured upgrade headers.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
    subprotocol: String,
    origin: Option<String>,
    user_agent: Option<String>,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Creates a connector for `config.ws_url`.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            url: config.ws_url.clone(),
            subprotocol: config.subprotocol.clone(),
            origin: config.origin.clone(),
            user_agent: config.user_agent.clone(),
            connect_timeout: config.connect_timeout,
        }
    }

    /// Builds the upgrade request, including subprotocol, origin and user
    /// agent headers.
    pub fn build_request(&self) -> Result<Request, TransportError> {
        let mut request = self.url.as_str().into_client_request()?;
        let headers = request.headers_mut();

        let header_value = |name: &str, value: &str| {
            HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("Invalid {name} header value: {e}"))
            })
        };

        if !self.subprotocol.is_empty() {
            headers.insert(
                header::SEC_WEBSOCKET_PROTOCOL,
                header_value("Sec-WebSocket-Protocol", &self.subprotocol)?,
            );
        }
        if let Some(origin) = &self.origin {
            headers.insert(header::ORIGIN, header_value("Origin", origin)?);
        }
        if let Some(user_agent) = &self.user_agent {
            headers.insert(header::USER_AGENT, header_value("User-Agent", user_agent)?);
        }

        Ok(request)
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let request = self.build_request()?;
        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::ConnectTimeout)??;
        tracing::debug!(url = %self.url, status = %response.status(), "WebSocket connection established.");
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

/// An open websocket connection.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await.map_err(closed_or)
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => tracing::debug!("Ignoring non UTF-8 binary message."),
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(frame = ?frame, "Peer closed the websocket.");
                    return Ok(None);
                }
                // Ping, pong and raw frames are handled by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(tungstenite::Error::ConnectionClosed)) | None => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn closed_or(e: tungstenite::Error) -> TransportError {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => other.into(),
    }
}
