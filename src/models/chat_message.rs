//! This module defines the `ChatMessage` struct.

use chrono::{DateTime, Utc};

/// A single chat message as observed by the connection supervisor.
///
/// Created on receipt and consumed immediately by the detector; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Display name of the author.
    pub username: String,

    /// Message body.
    pub text: String,

    /// When the message was received by this process.
    pub observed_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message observed at `observed_at`.
    pub fn new(
        username: impl Into<String>,
        text: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self { username: username.into(), text: text.into(), observed_at }
    }

    /// Creates a message observed now.
    pub fn received_now(username: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(username, text, Utc::now())
    }

    /// Returns at most `max_chars` characters of the text.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        truncate_chars(&self.text, max_chars)
    }
}

/// Truncates `s` to at most `max_chars` Unicode scalar values.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_text_is_noop() {
        assert_eq!(truncate_chars("hello", 100), "hello");
        assert_eq!(truncate_chars("", 100), "");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "kazandı".repeat(20);
        let cut = truncate_chars(&text, 100);
        assert_eq!(cut.chars().count(), 100);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn test_excerpt_uses_message_text() {
        let message = ChatMessage::received_now("user", "abcdef");
        assert_eq!(message.excerpt(3), "abc");
    }
}
