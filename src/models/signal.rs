//! Result of matching a message against the content signals.

/// What a message says about the configured target and keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalMatch {
    /// The target identity appears in the username or the text.
    pub target_mentioned: bool,

    /// Every configured keyword found in the text, in configuration order.
    pub matched_keywords: Vec<String>,
}

impl SignalMatch {
    /// True when the message carries any signal at all.
    pub fn has_signal(&self) -> bool {
        self.target_mentioned || !self.matched_keywords.is_empty()
    }
}
