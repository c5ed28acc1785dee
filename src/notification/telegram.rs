//! Telegram Bot API notifier.
//!
//! Sends rendered alerts through `sendMessage` using the retrying HTTP client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use super::{NotificationSink, error::NotificationError, payload_builder::TelegramPayloadBuilder};
use crate::{
    config::{AppConfig, Credentials},
    http_client::create_notifier_http_client,
};

/// Delivers alerts to one Telegram chat.
pub struct TelegramNotifier {
    /// Full `sendMessage` URL, including the bot token.
    url: Url,
    /// Bot token, scrubbed from request errors before they are reported.
    token: String,
    /// Builds the JSON body for each message.
    builder: TelegramPayloadBuilder,
    /// Configured HTTP client with retry capabilities
    client: Arc<ClientWithMiddleware>,
}

impl TelegramNotifier {
    /// Creates a notifier posting to `{api_url}/bot{token}/sendMessage`.
    pub fn new(
        api_url: &str,
        credentials: &Credentials,
        disable_web_preview: bool,
        client: Arc<ClientWithMiddleware>,
    ) -> Result<Self, NotificationError> {
        let endpoint =
            format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), credentials.bot_token);
        let url = Url::parse(&endpoint).map_err(|e| {
            NotificationError::ConfigError(format!("Invalid Telegram API URL '{api_url}': {e}"))
        })?;
        Ok(Self {
            url,
            token: credentials.bot_token.clone(),
            builder: TelegramPayloadBuilder {
                chat_id: credentials.chat_id.clone(),
                disable_web_preview,
            },
            client,
        })
    }

    /// Creates a notifier from the application configuration, building its
    /// own HTTP client.
    pub fn from_config(
        config: &AppConfig,
        credentials: &Credentials,
    ) -> Result<Self, NotificationError> {
        let client = Arc::new(create_notifier_http_client(&config.http_retry_config)?);
        Self::new(&config.telegram_api_url, credentials, config.disable_web_preview, client)
    }

    /// Wraps a failed request so that neither the URL nor the token ends up
    /// in the error text.
    fn request_failed(&self, error: reqwest_middleware::Error) -> NotificationError {
        match error {
            reqwest_middleware::Error::Reqwest(e) => {
                NotificationError::RequestError(reqwest_middleware::Error::Reqwest(e.without_url()))
            }
            other => NotificationError::NotifyFailed(format!(
                "Telegram request failed: {}",
                redact(&format!("{other:#}"), &self.token)
            )),
        }
    }
}

fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() { text.to_string() } else { text.replace(secret, "<redacted>") }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn deliver(&self, text: &str) -> Result<(), NotificationError> {
        let payload = self.builder.build_payload(text);
        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.request_failed(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::NotifyFailed(format!(
                "Telegram request failed with status {status}: {body}"
            )));
        }

        Ok(())
    }
}
