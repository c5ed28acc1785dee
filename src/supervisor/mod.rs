//! The Supervisor module manages the lifecycle of the burst detector.
//!
//! The `Supervisor` is the top-level owner of the running application. It
//! listens for shutdown signals (Ctrl+C or SIGTERM), runs the
//! [`ConnectionSupervisor`] on its own task, and restarts that task after
//! `restart_delay` if it ever dies unexpectedly. The detection state lives in
//! a shared [`BurstDetector`], so a restart keeps the rate history and the
//! alert cooldown.
//!
//! On shutdown the connection is drained first, then in-flight alert
//! deliveries are given up to `shutdown_timeout` to finish.

mod builder;
mod connection;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
pub use connection::{ConnectionError, ConnectionState, ConnectionSupervisor};
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{config::AppConfig, engine::BurstDetector};

/// Represents the set of errors that can occur while building or running the
/// supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A connector was not provided to the `SupervisorBuilder`.
    #[error("Missing connector for Supervisor")]
    MissingConnector,

    /// Neither a notification sink nor a detector was provided to the
    /// `SupervisorBuilder`.
    #[error("Missing notification sink for Supervisor")]
    MissingNotificationSink,
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    config: Arc<AppConfig>,
    connection: Arc<ConnectionSupervisor>,
    cancellation_token: CancellationToken,
}

impl Supervisor {
    /// Creates a new `SupervisorBuilder`.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Creates a supervisor around an already wired connection supervisor.
    ///
    /// `cancellation_token` must be the token `connection` observes.
    pub fn new(
        config: Arc<AppConfig>,
        connection: Arc<ConnectionSupervisor>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { config, connection, cancellation_token }
    }

    /// A token that stops the supervisor when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// The supervised connection.
    pub fn connection(&self) -> &Arc<ConnectionSupervisor> {
        &self.connection
    }

    /// The shared detection state.
    pub fn detector(&self) -> &Arc<BurstDetector> {
        self.connection.detector()
    }

    /// Runs until a shutdown signal arrives or the cancellation token is
    /// cancelled.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let signal_handler = tokio::spawn(wait_for_shutdown_signal(self.cancellation_token.clone()));

        loop {
            let connection = Arc::clone(&self.connection);
            let handle = tokio::spawn(async move { connection.run().await });

            match handle.await {
                Ok(()) if self.cancellation_token.is_cancelled() => break,
                Ok(()) => tracing::warn!(
                    "Connection task returned unexpectedly. Restarting in {:?}...",
                    self.config.restart_delay
                ),
                Err(e) => tracing::error!(
                    error = %e,
                    "Connection task failed. Restarting in {:?}...",
                    self.config.restart_delay
                ),
            }

            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => break,
                _ = tokio::time::sleep(self.config.restart_delay) => {}
            }
        }

        signal_handler.abort();
        self.drain_deliveries().await;
        tracing::info!("Supervisor shut down.");
        Ok(())
    }

    async fn drain_deliveries(&self) {
        let detector = self.connection.detector();
        let pending = detector.pending_deliveries();
        if pending == 0 {
            return;
        }
        tracing::info!(pending, "Waiting for in-flight alert deliveries...");
        if tokio::time::timeout(self.config.shutdown_timeout, detector.wait_for_deliveries())
            .await
            .is_err()
        {
            tracing::warn!(
                pending = detector.pending_deliveries(),
                "Shutdown timeout elapsed with deliveries still in flight."
            );
        }
    }
}

async fn wait_for_shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = signal::ctrl_c();
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
        _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
    }

    cancellation_token.cancel();
}
