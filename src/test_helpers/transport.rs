use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    models::Frame,
    providers::{Connector, Transport, TransportError},
};

/// What the scripted server does next on a connection.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Delivers a text frame.
    Text(String),
    /// Closes the connection from the server side.
    Close,
    /// Fails the next receive with a transport error.
    Fail,
}

enum Script {
    Accept(ScriptedTransport),
    Refuse,
}

/// A `Connector` whose connections are scripted by the test.
///
/// Each call to `connect` consumes the next queued script. Once the queue is
/// empty, `connect` never completes.
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    attempts: AtomicUsize,
    open: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    /// Creates a connector with no scripted connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful connection and returns the server side of it.
    pub fn expect_connection(&self) -> ServerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stalled = Arc::new(AtomicBool::new(false));
        let transport = ScriptedTransport {
            inbound: rx,
            sent: Arc::clone(&sent),
            stalled: Arc::clone(&stalled),
            open: None,
        };
        self.scripts.lock().unwrap().push_back(Script::Accept(transport));
        ServerHandle { tx, sent, stalled }
    }

    /// Queues a refused connection attempt.
    pub fn expect_refusal(&self) {
        self.scripts.lock().unwrap().push_back(Script::Refuse);
    }

    /// Number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of transports handed out and not yet dropped.
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.scripts.lock().unwrap().pop_front();
        match next {
            Some(Script::Accept(mut transport)) => {
                self.open.fetch_add(1, Ordering::SeqCst);
                transport.open = Some(Arc::clone(&self.open));
                Ok(Box::new(transport))
            }
            Some(Script::Refuse) => Err(TransportError::InvalidRequest("connection refused".into())),
            None => std::future::pending().await,
        }
    }
}

/// Client side of a scripted connection.
pub struct ScriptedTransport {
    inbound: mpsc::UnboundedReceiver<ServerEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    stalled: Arc<AtomicBool>,
    /// Set once handed out by the connector.
    open: Option<Arc<AtomicUsize>>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        match self.inbound.recv().await {
            Some(ServerEvent::Text(text)) => Ok(Some(text)),
            Some(ServerEvent::Close) | None => Ok(None),
            Some(ServerEvent::Fail) => Err(TransportError::InvalidRequest("scripted failure".into())),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        if let Some(open) = &self.open {
            open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Server side of a scripted connection.
///
/// Events are buffered, so they can be queued before the client connects.
/// Dropping the handle closes the connection.
pub struct ServerHandle {
    tx: mpsc::UnboundedSender<ServerEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    stalled: Arc<AtomicBool>,
}

impl ServerHandle {
    /// Sends raw text, which need not be valid JSON.
    pub fn send_raw(&self, text: impl Into<String>) {
        let _ = self.tx.send(ServerEvent::Text(text.into()));
    }

    /// Sends a protocol frame.
    pub fn send_frame(&self, frame: &Frame) {
        self.send_raw(frame.encode().unwrap());
    }

    /// Sends `connection_ack`.
    pub fn ack(&self) {
        self.send_frame(&Frame::ConnectionAck { payload: None });
    }

    /// Sends a `next` frame carrying one chat message.
    pub fn chat(&self, username: &str, text: &str) {
        self.send_raw(chat_frame(username, text));
    }

    /// Closes the connection from the server side.
    pub fn close(&self) {
        let _ = self.tx.send(ServerEvent::Close);
    }

    /// Makes the client's next receive fail.
    pub fn fail(&self) {
        let _ = self.tx.send(ServerEvent::Fail);
    }

    /// Stops accepting frames from the client: every later send hangs.
    pub fn stop_reading(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    /// Frames the client has sent on this connection, decoded.
    pub fn received_frames(&self) -> Vec<Frame> {
        self.sent.lock().unwrap().iter().map(|text| Frame::decode(text).unwrap()).collect()
    }

    /// Number of frames of the given kind the client has sent.
    pub fn received_count(&self, kind: &str) -> usize {
        self.received_frames().iter().filter(|f| f.kind() == kind).count()
    }
}

/// The JSON text of a `next` frame carrying one chat message.
pub fn chat_frame(username: &str, text: &str) -> String {
    serde_json::json!({
        "id": "chat-subscription",
        "type": "next",
        "payload": {
            "data": {
                "chatMessages": {
                    "id": "1",
                    "data": { "__typename": "ChatMessageDataText", "message": text },
                    "user": { "name": username, "id": "u1" }
                }
            }
        }
    })
    .to_string()
}
