//! Per-message pipeline: record the message in the rate window, score it
//! with the alert policy, and hand fired alerts to the notification sink.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::task::TaskTracker;

use super::{AlertPolicy, RateWindow};
use crate::{
    config::AppConfig,
    models::{AlertDecision, ChatMessage, SuppressReason},
    notification::NotificationSink,
};

/// Number of characters of each message echoed to the log.
const LOG_EXCERPT_CHARS: usize = 50;

/// Result of observing a single message.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Rate in messages per minute, including the observed message.
    pub rate: f64,
    /// The alert decision for the observed message.
    pub decision: AlertDecision,
}

/// Owns the detection state for one chat stream.
///
/// The state outlives individual connections, so a reconnect or a restart of
/// the connection task keeps both the rate history and the cooldown.
pub struct BurstDetector {
    rate_window: Mutex<RateWindow>,
    policy: AlertPolicy,
    sink: Arc<dyn NotificationSink>,
    /// In-flight deliveries, so shutdown can wait for them.
    deliveries: TaskTracker,
}

impl BurstDetector {
    /// Creates a detector with an empty window and a policy that never fired.
    pub fn new(config: &AppConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            rate_window: Mutex::new(RateWindow::new(config.window, config.window_capacity)),
            policy: AlertPolicy::new(config),
            sink,
            deliveries: TaskTracker::new(),
        }
    }

    /// Observes one message.
    ///
    /// The rate includes the message itself before the policy scores it. A
    /// fired alert is delivered on a background task; the cooldown is already
    /// in effect when this returns. Must be called from within a Tokio
    /// runtime.
    pub fn observe(&self, message: &ChatMessage) -> Observation {
        let rate = {
            let mut window = self.rate_window.lock().unwrap_or_else(PoisonError::into_inner);
            window.record(message.observed_at);
            window.current_rate_at(message.observed_at)
        };

        tracing::info!(
            "[{}] [{:.1} msg/min] {}: {}",
            message.observed_at.with_timezone(&chrono::Local).format("%H:%M:%S"),
            rate,
            message.username,
            message.excerpt(LOG_EXCERPT_CHARS)
        );

        let decision = self.policy.evaluate(message, rate);
        match &decision {
            AlertDecision::Fire(text) => {
                tracing::info!(rate = rate, username = %message.username, "Burst detected, dispatching alert.");
                self.dispatch(text.clone());
            }
            AlertDecision::Suppressed(SuppressReason::Cooldown) => {
                tracing::debug!(rate = rate, "Burst detected but alert is cooling down.");
            }
            AlertDecision::Suppressed(SuppressReason::NoAnomaly) => {}
        }

        Observation { rate, decision }
    }

    /// Current rate in messages per minute.
    pub fn current_rate(&self) -> f64 {
        self.rate_window.lock().unwrap_or_else(PoisonError::into_inner).current_rate()
    }

    /// The alert policy, for inspecting the cooldown state.
    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Number of deliveries still running.
    pub fn pending_deliveries(&self) -> usize {
        self.deliveries.len()
    }

    /// Waits until every delivery dispatched so far has finished.
    pub async fn wait_for_deliveries(&self) {
        self.deliveries.close();
        self.deliveries.wait().await;
        self.deliveries.reopen();
    }

    fn dispatch(&self, text: String) {
        let sink = Arc::clone(&self.sink);
        self.deliveries.spawn(async move {
            match sink.deliver(&text).await {
                Ok(()) => tracing::info!("Alert delivered."),
                Err(e) => tracing::error!(error = %e, "Failed to deliver alert."),
            }
        });
    }
}
