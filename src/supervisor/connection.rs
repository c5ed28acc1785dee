//! The connection supervisor keeps one subscription to the chat stream alive.
//!
//! Each session walks through `Connecting → Handshaking → Subscribed`, feeds
//! every chat message to the [`BurstDetector`], and then drains: the
//! transport is closed and released before `Disconnected` is published. After any failure the supervisor
//! waits `reconnect_delay` and starts a fresh session, until cancelled.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::BurstDetector,
    models::{ChatPayload, Frame},
    providers::{Connector, Transport, TransportError},
};

/// Lifecycle state of the subscription connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection is held.
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Waiting for the server to acknowledge `connection_init`.
    Handshaking,
    /// Receiving chat messages.
    Subscribed,
    /// Closing and releasing the transport.
    ///
    /// Only passed through while a session unwinds. It is logged but never
    /// published, so observers go straight from a live state to
    /// `Disconnected`.
    Draining,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Subscribed => "subscribed",
            ConnectionState::Draining => "draining",
        };
        f.write_str(name)
    }
}

/// Reasons a session ends. None of them is fatal to the supervisor.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The transport failed to connect, send or receive.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server sent a frame that violates the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A frame or its payload was not valid JSON of the expected shape.
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// `connection_ack` did not arrive in time.
    #[error("Timed out waiting for connection_ack")]
    HandshakeTimeout,

    /// The peer closed the connection.
    #[error("Connection closed by peer")]
    Closed,

    /// The server completed the subscription.
    #[error("Subscription completed by server")]
    SubscriptionCompleted,
}

/// Owns the subscription lifecycle: connect, handshake, subscribe, receive,
/// and reconnect after failures.
pub struct ConnectionSupervisor {
    config: Arc<AppConfig>,
    connector: Arc<dyn Connector>,
    detector: Arc<BurstDetector>,
    state_tx: watch::Sender<ConnectionState>,
    connect_attempts: AtomicU64,
    cancellation_token: CancellationToken,
}

impl ConnectionSupervisor {
    /// Creates a supervisor in the `Disconnected` state.
    pub fn new(
        config: Arc<AppConfig>,
        connector: Arc<dyn Connector>,
        detector: Arc<BurstDetector>,
        cancellation_token: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            connector,
            detector,
            state_tx,
            connect_attempts: AtomicU64::new(0),
            cancellation_token,
        }
    }

    /// Subscribes to state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The current state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Number of connection attempts made so far.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// The detector fed by this supervisor.
    pub fn detector(&self) -> &Arc<BurstDetector> {
        &self.detector
    }

    /// Runs sessions back to back until the cancellation token fires.
    ///
    /// Every session failure is logged and followed by `reconnect_delay`. On
    /// return no transport is held and the state is `Disconnected`, which also
    /// holds if the future is dropped or its task panics.
    pub async fn run(&self) {
        let _disconnected = DisconnectOnDrop(self);
        tracing::info!(url = %self.config.ws_url, "Connection supervisor started.");
        while !self.cancellation_token.is_cancelled() {
            let attempt = self.connect_attempts.fetch_add(1, Ordering::Relaxed) + 1;
            match self.run_session().await {
                Ok(()) => break,
                Err(e) => tracing::warn!(
                    error = %e,
                    attempt,
                    "Connection lost. Reconnecting in {:?}...",
                    self.config.reconnect_delay
                ),
            }

            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
        tracing::info!("Connection supervisor stopped.");
    }

    /// Runs one session. `Ok` means it ended because of cancellation.
    async fn run_session(&self) -> Result<(), ConnectionError> {
        self.set_state(ConnectionState::Connecting);
        let connected = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => {
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }
            result = self.connector.connect() => result,
        };
        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e.into());
            }
        };
        tracing::info!(url = %self.config.ws_url, "Connected to chat stream.");

        let result = self.drive(transport.as_mut()).await;

        tracing::debug!(state = %ConnectionState::Draining, "Releasing transport.");
        match tokio::time::timeout(self.config.close_timeout, transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "Error while closing transport."),
            Err(_) => tracing::debug!("Closing handshake timed out."),
        }
        drop(transport);
        self.set_state(ConnectionState::Disconnected);

        result
    }

    /// Handshake, subscribe, then receive until the session ends.
    async fn drive(&self, transport: &mut dyn Transport) -> Result<(), ConnectionError> {
        self.set_state(ConnectionState::Handshaking);
        self.send_frame(transport, &Frame::connection_init()).await?;

        let handshake = tokio::time::timeout(self.config.handshake_timeout, self.await_ack(transport));
        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => return Ok(()),
            result = handshake => result.map_err(|_| ConnectionError::HandshakeTimeout)??,
        }
        tracing::debug!("Connection acknowledged.");

        let subscribe =
            Frame::subscribe(&self.config.subscription_id, &self.config.subscription_query);
        self.send_frame(transport, &subscribe).await?;
        self.set_state(ConnectionState::Subscribed);
        tracing::info!(id = %self.config.subscription_id, "Subscribed to chat messages.");

        self.receive(transport).await
    }

    /// Waits for `connection_ack`, answering pings in the meantime.
    async fn await_ack(&self, transport: &mut dyn Transport) -> Result<(), ConnectionError> {
        loop {
            let text = transport.recv().await?.ok_or(ConnectionError::Closed)?;
            match Frame::decode(&text)? {
                Frame::ConnectionAck { .. } => return Ok(()),
                Frame::Ping { .. } => self.send_frame(transport, &Frame::pong()).await?,
                Frame::Pong { .. } => {}
                other => {
                    return Err(ConnectionError::Protocol(format!(
                        "expected connection_ack, got {}",
                        other.kind()
                    )));
                }
            }
        }
    }

    /// Receive loop of a subscribed session. A quiet connection gets a
    /// keepalive ping after every `idle_timeout`.
    async fn receive(&self, transport: &mut dyn Transport) -> Result<(), ConnectionError> {
        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => return Ok(()),
                received = tokio::time::timeout(self.config.idle_timeout, transport.recv()) => received,
            };

            match received {
                Err(_) => {
                    tracing::debug!("No frames for {:?}, sending ping.", self.config.idle_timeout);
                    self.send_frame(transport, &Frame::ping()).await?;
                }
                Ok(Ok(Some(text))) => self.handle_frame(transport, &text).await?,
                Ok(Ok(None)) => return Err(ConnectionError::Closed),
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn handle_frame(
        &self,
        transport: &mut dyn Transport,
        text: &str,
    ) -> Result<(), ConnectionError> {
        match Frame::decode(text)? {
            Frame::Next { payload, .. } => match ChatPayload::decode(&payload, Utc::now())? {
                ChatPayload::Message(message) => {
                    self.detector.observe(&message);
                }
                ChatPayload::Empty => tracing::trace!("Ignoring chat payload without text."),
                ChatPayload::Errors(errors) => {
                    tracing::warn!(errors = %errors, "Subscription reported errors.");
                }
            },
            Frame::Ping { .. } => self.send_frame(transport, &Frame::pong()).await?,
            Frame::Error { payload, .. } => {
                return Err(ConnectionError::Protocol(format!("subscription error: {payload}")));
            }
            Frame::Complete { .. } => return Err(ConnectionError::SubscriptionCompleted),
            other => tracing::trace!(kind = other.kind(), "Ignoring frame."),
        }
        Ok(())
    }

    /// Sends one frame. A peer that stops reading fails the send after
    /// `handshake_timeout`.
    async fn send_frame(
        &self,
        transport: &mut dyn Transport,
        frame: &Frame,
    ) -> Result<(), ConnectionError> {
        let text = frame.encode()?;
        tokio::time::timeout(self.config.handshake_timeout, transport.send(text))
            .await
            .map_err(|_| TransportError::SendTimeout)??;
        Ok(())
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "Connection state changed.");
        }
    }
}

/// Publishes `Disconnected` when `run` ends, however it ends.
struct DisconnectOnDrop<'a>(&'a ConnectionSupervisor);

impl Drop for DisconnectOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set_state(ConnectionState::Disconnected);
    }
}
