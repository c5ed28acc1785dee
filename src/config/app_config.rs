use std::{path::Path, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{
    ConfigurationError, HttpRetryConfig, deserialize_duration_from_seconds, deserialize_keywords,
    deserialize_ws_url,
};

fn default_ws_url() -> Url {
    Url::parse("wss://stake.com/_api/websockets").expect("static websocket url is valid")
}

fn default_subprotocol() -> String {
    "graphql-transport-ws".to_string()
}

fn default_origin() -> Option<String> {
    Some("https://stake.com".to_string())
}

fn default_user_agent() -> Option<String> {
    Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string())
}

fn default_subscription_id() -> String {
    "chat-subscription".to_string()
}

fn default_subscription_query() -> String {
    "subscription { chatMessages { id createdAt data { __typename ... on ChatMessageDataText { \
     message } } user { name id } } }"
        .to_string()
}

fn default_normal_rate() -> f64 {
    15.0
}

fn default_spike_threshold() -> f64 {
    35.0
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

fn default_window_capacity() -> usize {
    100
}

fn default_target_identity() -> String {
    "777aldo".to_string()
}

fn default_keywords() -> Vec<String> {
    [
        "parlay", "kazandı", "won", "gg", "wp", "congrats", "tebrikler", "tebrikler abi",
        "tebrik", "helal", "helal olsun", "geldi", "tuttu", "tutmuş", "kazanmış", "efsane",
        "süper", "müthiş", "harika", "rain geliyor", "rain gelir", "rain yakında", "rain var",
        "kupon tuttu", "parlay tuttu", "kupon geldi", "777", "aldo", "başardı", "yaptı",
        "kazandın",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_cooldown() -> Duration {
    Duration::from_secs(300)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_handshake_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_close_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_restart_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_disable_web_preview() -> bool {
    true
}

fn default_alert_title() -> String {
    "CHAT BURST ALERT".to_string()
}

/// Application configuration for the burst detector.
///
/// Loaded once at startup and never mutated afterwards. Every field has a
/// default, so an absent `app.yaml` yields a working configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Websocket endpoint of the chat subscription service.
    #[serde(default = "default_ws_url", deserialize_with = "deserialize_ws_url")]
    pub ws_url: Url,

    /// Value of the `Sec-WebSocket-Protocol` header.
    #[serde(default = "default_subprotocol")]
    pub subprotocol: String,

    /// Optional `Origin` header sent with the websocket upgrade.
    #[serde(default = "default_origin")]
    pub origin: Option<String>,

    /// Optional `User-Agent` header sent with the websocket upgrade.
    #[serde(default = "default_user_agent")]
    pub user_agent: Option<String>,

    /// Identifier used for the chat subscription.
    #[serde(default = "default_subscription_id")]
    pub subscription_id: String,

    /// GraphQL subscription document selecting chat messages.
    #[serde(default = "default_subscription_query")]
    pub subscription_query: String,

    /// Baseline message rate, reported in alerts for comparison.
    #[serde(default = "default_normal_rate")]
    pub normal_rate_per_minute: f64,

    /// Rate strictly above which the chat counts as spiking.
    #[serde(default = "default_spike_threshold")]
    pub spike_threshold_per_minute: f64,

    /// Length of the rate evaluation window, in seconds.
    #[serde(
        rename = "window_secs",
        default = "default_window",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub window: Duration,

    /// Maximum number of timestamps retained by the rate window.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Identity whose mention counts as a signal.
    #[serde(default = "default_target_identity")]
    pub target_identity: String,

    /// Keywords whose presence counts as a signal, in reporting order.
    #[serde(default = "default_keywords", deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,

    /// Minimum time between two alerts, in seconds.
    #[serde(
        rename = "cooldown_secs",
        default = "default_cooldown",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub cooldown: Duration,

    /// Bound on establishing the websocket connection, in seconds.
    #[serde(
        rename = "connect_timeout_secs",
        default = "default_connect_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub connect_timeout: Duration,

    /// Bound on waiting for `connection_ack`, in seconds.
    #[serde(
        rename = "handshake_timeout_secs",
        default = "default_handshake_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub handshake_timeout: Duration,

    /// Idle period after which a keepalive ping is sent, in seconds.
    #[serde(
        rename = "idle_timeout_secs",
        default = "default_idle_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub idle_timeout: Duration,

    /// Bound on the closing handshake when releasing a connection, in seconds.
    #[serde(
        rename = "close_timeout_secs",
        default = "default_close_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub close_timeout: Duration,

    /// Delay before reconnecting after a dropped connection, in seconds.
    #[serde(
        rename = "reconnect_delay_secs",
        default = "default_reconnect_delay",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub reconnect_delay: Duration,

    /// Delay before restarting the connection task after it failed, in
    /// seconds.
    #[serde(
        rename = "restart_delay_secs",
        default = "default_restart_delay",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub restart_delay: Duration,

    /// The maximum time in seconds to wait for in-flight deliveries on
    /// shutdown.
    #[serde(
        rename = "shutdown_timeout_secs",
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub shutdown_timeout: Duration,

    /// Base URL of the Telegram Bot API.
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,

    /// Whether link previews are disabled in alert messages.
    #[serde(default = "default_disable_web_preview")]
    pub disable_web_preview: bool,

    /// Headline of the alert message.
    #[serde(default = "default_alert_title")]
    pub alert_title: String,

    /// Closing line of the alert message. Omitted when unset or blank.
    #[serde(default)]
    pub alert_footer: Option<String>,

    /// Retry policy of the notification HTTP client.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            subprotocol: default_subprotocol(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            subscription_id: default_subscription_id(),
            subscription_query: default_subscription_query(),
            normal_rate_per_minute: default_normal_rate(),
            spike_threshold_per_minute: default_spike_threshold(),
            window: default_window(),
            window_capacity: default_window_capacity(),
            target_identity: default_target_identity(),
            keywords: default_keywords(),
            cooldown: default_cooldown(),
            connect_timeout: default_connect_timeout(),
            handshake_timeout: default_handshake_timeout(),
            idle_timeout: default_idle_timeout(),
            close_timeout: default_close_timeout(),
            reconnect_delay: default_reconnect_delay(),
            restart_delay: default_restart_delay(),
            shutdown_timeout: default_shutdown_timeout(),
            telegram_api_url: default_telegram_api_url(),
            disable_web_preview: default_disable_web_preview(),
            alert_title: default_alert_title(),
            alert_footer: None,
            http_retry_config: HttpRetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `<config_dir>/app.yaml` (optional) and
    /// `SURGE__*` environment overrides, then validates it.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigurationError> {
        let config_dir = Path::new(config_dir.unwrap_or("configs"));
        let file = config_dir.join("app.yaml");
        let s = Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(Environment::with_prefix("SURGE").separator("__"))
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.window.is_zero() {
            return Err(ConfigurationError::Invalid("window_secs must be positive".into()));
        }
        if self.window_capacity == 0 {
            return Err(ConfigurationError::Invalid("window_capacity must be positive".into()));
        }
        if self.idle_timeout.is_zero() {
            return Err(ConfigurationError::Invalid("idle_timeout_secs must be positive".into()));
        }
        if self.handshake_timeout.is_zero() {
            return Err(ConfigurationError::Invalid(
                "handshake_timeout_secs must be positive".into(),
            ));
        }
        for (name, value) in [
            ("normal_rate_per_minute", self.normal_rate_per_minute),
            ("spike_threshold_per_minute", self.spike_threshold_per_minute),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.keywords.iter().any(|k| k.is_empty()) {
            return Err(ConfigurationError::Invalid("keywords must not contain empty entries".into()));
        }
        Url::parse(&self.telegram_api_url).map_err(|e| {
            ConfigurationError::Invalid(format!(
                "telegram_api_url '{}' is not a valid URL: {e}",
                self.telegram_api_url
            ))
        })?;
        Ok(())
    }
}
