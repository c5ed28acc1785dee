//! # Telegram Payload Builder
//!
//! Builds the JSON body of a Bot API `sendMessage` call. The alert text is
//! already rendered with Telegram HTML markup, so no further escaping happens
//! here.

use serde_json::json;

/// A payload builder for Telegram notifications.
///
/// Telegram requires a `chat_id` and the message content in a `text` field.
/// `parse_mode` is fixed to `HTML`, which is what the alert renderer emits.
#[derive(Debug, Clone)]
pub struct TelegramPayloadBuilder {
    /// The chat ID to send the message to.
    pub chat_id: String,
    /// Whether to disable web page previews in the message.
    pub disable_web_preview: bool,
}

impl TelegramPayloadBuilder {
    /// Builds the `sendMessage` payload for `text`.
    pub fn build_payload(&self, text: &str) -> serde_json::Value {
        json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": self.disable_web_preview
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_payload_builder() {
        let builder =
            TelegramPayloadBuilder { chat_id: "12345".to_string(), disable_web_preview: true };
        let payload = builder.build_payload("🚨 <b>Alert</b>\n\nbody & more");
        assert_eq!(
            payload,
            json!({
                "chat_id": "12345",
                "text": "🚨 <b>Alert</b>\n\nbody & more",
                "parse_mode": "HTML",
                "disable_web_page_preview": true
            })
        );
    }
}
