//! Integration tests for the connection supervisor, driven by a scripted
//! transport on a paused clock.

use std::{sync::Arc, time::Duration};

use serde_json::json;
use surge::{
    config::AppConfig,
    engine::BurstDetector,
    models::Frame,
    providers::Connector,
    supervisor::{ConnectionState, ConnectionSupervisor},
    test_helpers::{AppConfigBuilder, RecordingSink, ScriptedConnector},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Harness {
    connector: Arc<ScriptedConnector>,
    supervisor: Arc<ConnectionSupervisor>,
    sink: RecordingSink,
    token: CancellationToken,
}

impl Harness {
    fn new(config: AppConfig) -> Self {
        let connector = Arc::new(ScriptedConnector::new());
        let sink = RecordingSink::new();
        let detector = Arc::new(BurstDetector::new(&config, Arc::new(sink.clone())));
        let token = CancellationToken::new();
        let supervisor = Arc::new(ConnectionSupervisor::new(
            Arc::new(config),
            Arc::clone(&connector) as Arc<dyn Connector>,
            detector,
            token.clone(),
        ));
        Self { connector, supervisor, sink, token }
    }

    fn spawn(&self) -> JoinHandle<()> {
        let supervisor = Arc::clone(&self.supervisor);
        tokio::spawn(async move { supervisor.run().await })
    }

    async fn wait_for(&self, state: ConnectionState) {
        let mut rx = self.supervisor.subscribe_state();
        rx.wait_for(|s| *s == state).await.unwrap();
    }

    async fn shutdown(&self, task: JoinHandle<()>) {
        self.token.cancel();
        task.await.unwrap();
        assert_eq!(self.supervisor.state(), ConnectionState::Disconnected);
        assert_eq!(self.connector.open_connections(), 0);
    }
}

/// Lets the supervisor task process everything already queued.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_handshake_then_subscribe() {
    let config = AppConfigBuilder::new().build();
    let query = config.subscription_query.clone();
    let harness = Harness::new(config);
    let server = harness.connector.expect_connection();
    server.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;

    assert_eq!(
        server.received_frames(),
        vec![Frame::connection_init(), Frame::subscribe("chat-subscription", query)]
    );
    assert_eq!(harness.connector.open_connections(), 1);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_idle_connection_sends_one_ping_per_interval() {
    let harness = Harness::new(AppConfigBuilder::new().idle_timeout(Duration::from_secs(30)).build());
    let server = harness.connector.expect_connection();
    server.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(server.received_count("ping"), 0);

    tokio::time::sleep(Duration::from_secs(66)).await;
    assert_eq!(server.received_count("ping"), 3);
    assert_eq!(harness.supervisor.state(), ConnectionState::Subscribed);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_server_ping_is_answered_with_pong() {
    let harness = Harness::new(AppConfigBuilder::new().build());
    let server = harness.connector.expect_connection();
    server.send_frame(&Frame::ping());
    server.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;
    server.send_frame(&Frame::ping());
    settle().await;

    let kinds: Vec<_> = server.received_frames().iter().map(Frame::kind).collect();
    assert_eq!(kinds, vec!["connection_init", "pong", "subscribe", "pong"]);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_releases_connection_and_reconnects_once() {
    let harness = Harness::new(AppConfigBuilder::new().reconnect_delay(Duration::from_secs(5)).build());
    let server = harness.connector.expect_connection();
    server.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;

    server.send_raw("{not json");
    harness.wait_for(ConnectionState::Disconnected).await;
    assert_eq!(harness.connector.open_connections(), 0);
    assert_eq!(harness.connector.attempts(), 1);

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(harness.connector.attempts(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(harness.connector.attempts(), 2);
    assert_eq!(harness.supervisor.connect_attempts(), 2);
    assert_eq!(harness.supervisor.state(), ConnectionState::Connecting);

    // No further attempts while the second one is pending.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.connector.attempts(), 2);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_peer_close_resubscribes_on_new_connection() {
    let harness = Harness::new(AppConfigBuilder::new().build());
    let first = harness.connector.expect_connection();
    first.ack();
    let second = harness.connector.expect_connection();
    second.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;
    first.close();
    harness.wait_for(ConnectionState::Disconnected).await;
    harness.wait_for(ConnectionState::Subscribed).await;

    assert_eq!(harness.connector.attempts(), 2);
    assert_eq!(harness.connector.open_connections(), 1);
    assert_eq!(second.received_count("subscribe"), 1);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_triggers_reconnect() {
    let harness = Harness::new(AppConfigBuilder::new().build());
    let first = harness.connector.expect_connection();
    first.ack();
    let second = harness.connector.expect_connection();
    second.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;
    first.fail();
    harness.wait_for(ConnectionState::Disconnected).await;
    harness.wait_for(ConnectionState::Subscribed).await;

    assert_eq!(harness.connector.attempts(), 2);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_error_and_complete_frames_end_the_session() {
    let harness = Harness::new(AppConfigBuilder::new().build());
    let first = harness.connector.expect_connection();
    first.ack();
    let second = harness.connector.expect_connection();
    second.ack();
    let third = harness.connector.expect_connection();
    third.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;

    first.send_frame(&Frame::Error {
        id: "chat-subscription".into(),
        payload: json!([{ "message": "rate limited" }]),
    });
    harness.wait_for(ConnectionState::Disconnected).await;
    harness.wait_for(ConnectionState::Subscribed).await;
    assert_eq!(harness.connector.attempts(), 2);

    second.send_frame(&Frame::Complete { id: "chat-subscription".into() });
    harness.wait_for(ConnectionState::Disconnected).await;
    harness.wait_for(ConnectionState::Subscribed).await;
    assert_eq!(harness.connector.attempts(), 3);

    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_handshake_timeout_releases_connection() {
    let harness = Harness::new(
        AppConfigBuilder::new()
            .handshake_timeout(Duration::from_secs(1))
            .reconnect_delay(Duration::from_secs(5))
            .build(),
    );
    let _silent = harness.connector.expect_connection();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Handshaking).await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    assert_eq!(harness.supervisor.state(), ConnectionState::Disconnected);
    assert_eq!(harness.connector.open_connections(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.connector.attempts(), 2);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_stalled_init_send_releases_connection() {
    let harness = Harness::new(
        AppConfigBuilder::new()
            .handshake_timeout(Duration::from_secs(1))
            .reconnect_delay(Duration::from_secs(5))
            .build(),
    );
    let server = harness.connector.expect_connection();
    server.stop_reading();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Handshaking).await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    assert_eq!(harness.supervisor.state(), ConnectionState::Disconnected);
    assert_eq!(harness.connector.open_connections(), 0);
    assert!(server.received_frames().is_empty());
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_stalled_keepalive_send_triggers_reconnect() {
    let harness = Harness::new(
        AppConfigBuilder::new()
            .idle_timeout(Duration::from_secs(30))
            .handshake_timeout(Duration::from_secs(1))
            .reconnect_delay(Duration::from_secs(5))
            .build(),
    );
    let server = harness.connector.expect_connection();
    server.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;
    server.stop_reading();

    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(harness.supervisor.state(), ConnectionState::Subscribed);
    assert_eq!(harness.connector.open_connections(), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.supervisor.state(), ConnectionState::Disconnected);
    assert_eq!(harness.connector.open_connections(), 0);
    assert_eq!(server.received_count("ping"), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.connector.attempts(), 2);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_frame_during_handshake_is_rejected() {
    let harness = Harness::new(AppConfigBuilder::new().build());
    let server = harness.connector.expect_connection();
    server.chat("alice", "too early");

    let task = harness.spawn();
    settle().await;

    assert_eq!(harness.supervisor.state(), ConnectionState::Disconnected);
    assert_eq!(server.received_count("subscribe"), 0);
    assert_eq!(harness.connector.open_connections(), 0);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_refused_connection_is_retried_after_delay() {
    let harness = Harness::new(AppConfigBuilder::new().reconnect_delay(Duration::from_secs(5)).build());
    harness.connector.expect_refusal();
    let server = harness.connector.expect_connection();
    server.ack();

    let task = harness.spawn();
    settle().await;
    assert_eq!(harness.connector.attempts(), 1);
    assert_eq!(harness.supervisor.state(), ConnectionState::Disconnected);

    harness.wait_for(ConnectionState::Subscribed).await;
    assert_eq!(harness.connector.attempts(), 2);
    harness.shutdown(task).await;
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_reconnect_delay_stops_immediately() {
    let harness = Harness::new(AppConfigBuilder::new().reconnect_delay(Duration::from_secs(5)).build());
    harness.connector.expect_refusal();

    let task = harness.spawn();
    settle().await;
    harness.shutdown(task).await;

    assert_eq!(harness.connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_while_connecting_stops_the_loop() {
    let harness = Harness::new(AppConfigBuilder::new().build());

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Connecting).await;
    harness.shutdown(task).await;

    assert_eq!(harness.connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_chat_burst_over_the_stream_delivers_one_alert() {
    let harness = Harness::new(AppConfigBuilder::new().spike_threshold(35.0).build());
    let server = harness.connector.expect_connection();
    server.ack();

    let task = harness.spawn();
    harness.wait_for(ConnectionState::Subscribed).await;

    for i in 0..40 {
        server.chat(&format!("viewer{i}"), "hello");
    }
    server.send_raw(
        json!({ "type": "next", "id": "chat-subscription", "payload": { "data": null } })
            .to_string(),
    );
    server.chat("alice", "777aldo kazandı!");
    server.chat("bob", "777aldo again");
    settle().await;
    harness.supervisor.detector().wait_for_deliveries().await;

    let delivered = harness.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("777aldo mentioned!"));
    assert!(delivered[0].contains("alice: 777aldo kazandı!"));
    assert_eq!(harness.supervisor.state(), ConnectionState::Subscribed);
    harness.shutdown(task).await;
}
