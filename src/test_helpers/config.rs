use std::time::Duration;

use crate::config::AppConfig;

/// A builder for `AppConfig` instances used in tests.
///
/// Starts from the defaults with the production delays shortened to one
/// second each, so paused-clock tests stay readable.
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        let config = AppConfig {
            connect_timeout: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(1),
            close_timeout: Duration::from_secs(1),
            ..AppConfig::default()
        };
        Self { config }
    }

    /// Sets the spike threshold.
    pub fn spike_threshold(mut self, per_minute: f64) -> Self {
        self.config.spike_threshold_per_minute = per_minute;
        self
    }

    /// Sets the rate window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    /// Sets the alert cooldown.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    /// Sets the target identity.
    pub fn target_identity(mut self, target: &str) -> Self {
        self.config.target_identity = target.to_string();
        self
    }

    /// Sets the keyword list.
    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.config.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Sets the handshake timeout.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets the idle timeout that triggers keepalive pings.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets the delay between sessions.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    /// Sets the shutdown timeout for in-flight deliveries.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Sets the Telegram API base URL.
    pub fn telegram_api_url(mut self, url: &str) -> Self {
        self.config.telegram_api_url = url.to_string();
        self
    }

    /// Builds the `AppConfig`.
    pub fn build(self) -> AppConfig {
        self.config
    }
}
