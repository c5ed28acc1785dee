//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{ConnectionSupervisor, Supervisor, SupervisorError};
use crate::{
    config::AppConfig, engine::BurstDetector, notification::NotificationSink,
    providers::Connector,
};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    connector: Option<Arc<dyn Connector>>,
    sink: Option<Arc<dyn NotificationSink>>,
    detector: Option<Arc<BurstDetector>>,
    cancellation_token: Option<CancellationToken>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the connector used to open subscription transports.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the sink that receives fired alerts.
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Uses an existing detector instead of building one from the sink.
    pub fn detector(mut self, detector: Arc<BurstDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Uses an external cancellation token instead of a fresh one.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = Arc::new(self.config.ok_or(SupervisorError::MissingConfig)?);
        let connector = self.connector.ok_or(SupervisorError::MissingConnector)?;
        let detector = match (self.detector, self.sink) {
            (Some(detector), _) => detector,
            (None, Some(sink)) => Arc::new(BurstDetector::new(&config, sink)),
            (None, None) => return Err(SupervisorError::MissingNotificationSink),
        };
        let cancellation_token = self.cancellation_token.unwrap_or_default();

        let connection = Arc::new(ConnectionSupervisor::new(
            Arc::clone(&config),
            connector,
            detector,
            cancellation_token.clone(),
        ));
        tracing::debug!(
            window = ?config.window,
            threshold = config.spike_threshold_per_minute,
            cooldown = ?config.cooldown,
            "Supervisor assembled."
        );

        Ok(Supervisor::new(config, connection, cancellation_token))
    }
}
