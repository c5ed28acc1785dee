//! Integration tests for the top-level supervisor.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use surge::{
    config::AppConfig,
    providers::{Connector, Transport, TransportError},
    supervisor::{ConnectionState, Supervisor},
    test_helpers::{AppConfigBuilder, RecordingSink, ScriptedConnector},
};

/// Panics on the first connection attempt, then delegates.
struct PanicOnceConnector {
    inner: Arc<ScriptedConnector>,
    panicked: AtomicBool,
}

#[async_trait]
impl Connector for PanicOnceConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("connector blew up");
        }
        self.inner.connect().await
    }
}

fn build(config: AppConfig, connector: Arc<dyn Connector>, sink: RecordingSink) -> Supervisor {
    Supervisor::builder()
        .config(config)
        .connector(connector)
        .notification_sink(Arc::new(sink))
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_run_returns_after_cancellation() {
    let connector = Arc::new(ScriptedConnector::new());
    let server = connector.expect_connection();
    server.ack();
    let supervisor = build(AppConfigBuilder::new().build(), connector.clone(), RecordingSink::new());
    let token = supervisor.cancellation_token();
    let mut state = supervisor.connection().subscribe_state();

    let task = tokio::spawn(supervisor.run());
    state.wait_for(|s| *s == ConnectionState::Subscribed).await.unwrap();
    token.cancel();

    assert!(task.await.unwrap().is_ok());
    assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    assert_eq!(connector.open_connections(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connection_task_is_restarted_after_panic() {
    let scripted = Arc::new(ScriptedConnector::new());
    let server = scripted.expect_connection();
    server.ack();
    let connector =
        Arc::new(PanicOnceConnector { inner: Arc::clone(&scripted), panicked: AtomicBool::new(false) });
    let config = AppConfigBuilder::new().build();
    let restart_delay = config.restart_delay;
    let supervisor = build(config, connector, RecordingSink::new());
    let token = supervisor.cancellation_token();
    let connection = Arc::clone(supervisor.connection());

    let task = tokio::spawn(supervisor.run());

    tokio::time::sleep(restart_delay - Duration::from_secs(1)).await;
    assert_eq!(scripted.attempts(), 0);
    assert_eq!(connection.connect_attempts(), 1);
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(scripted.attempts(), 1);
    assert_eq!(connection.connect_attempts(), 2);
    assert_eq!(connection.state(), ConnectionState::Subscribed);

    token.cancel();
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_restart_delay_leaves_connection_disconnected() {
    let connector = Arc::new(PanicOnceConnector {
        inner: Arc::new(ScriptedConnector::new()),
        panicked: AtomicBool::new(false),
    });
    let supervisor = build(AppConfigBuilder::new().build(), connector, RecordingSink::new());
    let token = supervisor.cancellation_token();
    let connection = Arc::clone(supervisor.connection());

    let task = tokio::spawn(supervisor.run());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    token.cancel();
    assert!(task.await.unwrap().is_ok());
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(connection.connect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_pending_deliveries() {
    let connector = Arc::new(ScriptedConnector::new());
    let server = connector.expect_connection();
    server.ack();
    for i in 0..40 {
        server.chat(&format!("viewer{i}"), "hello");
    }
    server.chat("alice", "gg 777aldo");

    let sink = RecordingSink::new();
    let supervisor = build(
        AppConfigBuilder::new().spike_threshold(35.0).build(),
        connector.clone(),
        sink.clone(),
    );
    let token = supervisor.cancellation_token();
    let detector = Arc::clone(supervisor.detector());

    let task = tokio::spawn(supervisor.run());
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();
    assert!(task.await.unwrap().is_ok());

    assert_eq!(detector.pending_deliveries(), 0);
    assert_eq!(sink.delivered().len(), 1);
}
