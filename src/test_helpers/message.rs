use chrono::{DateTime, TimeDelta, Utc};

use crate::models::ChatMessage;

/// A builder for creating `ChatMessage` instances for testing.
pub struct ChatMessageBuilder {
    username: String,
    text: String,
    observed_at: DateTime<Utc>,
}

impl Default for ChatMessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatMessageBuilder {
    /// Creates a builder for a neutral message observed now.
    pub fn new() -> Self {
        Self { username: "viewer".to_string(), text: "hello".to_string(), observed_at: Utc::now() }
    }

    /// Sets the author.
    pub fn username(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    /// Sets the message body.
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Sets the observation time.
    pub fn observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Builds the `ChatMessage`.
    pub fn build(self) -> ChatMessage {
        ChatMessage::new(self.username, self.text, self.observed_at)
    }

    /// Builds `count` copies spread evenly over `span`, ending at the
    /// configured observation time.
    pub fn build_spread(self, count: usize, span: TimeDelta) -> Vec<ChatMessage> {
        if count == 0 {
            return Vec::new();
        }
        let step = span / count as i32;
        let start = self.observed_at - span;
        (1..=count)
            .map(|i| ChatMessage::new(&*self.username, &*self.text, start + step * i as i32))
            .collect()
    }
}
