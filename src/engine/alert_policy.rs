//! Alert decision and rendering.
//!
//! An alert fires when the chat is spiking *and* the message that tipped it
//! carries a signal (a target mention or a keyword), at most once per cooldown
//! period. The cooldown starts when the alert is decided, not when it is
//! delivered.

use std::{
    fmt::Write as _,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Local, Utc};

use super::signal_matcher::SignalMatcher;
use crate::{
    config::AppConfig,
    models::{AlertDecision, ChatMessage, SignalMatch, SuppressReason, chat_message::truncate_chars},
};

/// Number of characters of the triggering message quoted in an alert.
pub const ALERT_EXCERPT_CHARS: usize = 100;

/// Combines the rate, the content signals and the cooldown state into an
/// alert decision.
#[derive(Debug)]
pub struct AlertPolicy {
    matcher: SignalMatcher,
    target_identity: String,
    spike_threshold_per_minute: f64,
    normal_rate_per_minute: f64,
    cooldown: Duration,
    title: String,
    footer: Option<String>,
    /// Detection time of the last fired alert. The check against it and its
    /// update happen under the same lock.
    last_alert_at: Mutex<Option<DateTime<Utc>>>,
}

impl AlertPolicy {
    /// Creates a policy that has never fired.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            matcher: SignalMatcher::new(&config.target_identity, &config.keywords),
            target_identity: config.target_identity.clone(),
            spike_threshold_per_minute: config.spike_threshold_per_minute,
            normal_rate_per_minute: config.normal_rate_per_minute,
            cooldown: config.cooldown,
            title: config.alert_title.clone(),
            footer: config.alert_footer.clone().filter(|footer| !footer.trim().is_empty()),
            last_alert_at: Mutex::new(None),
        }
    }

    /// Decides whether `message`, observed while the chat runs at `rate`
    /// messages per minute, fires an alert.
    ///
    /// The message's `observed_at` is the detection time. Never fails.
    pub fn evaluate(&self, message: &ChatMessage, rate: f64) -> AlertDecision {
        let is_spike = rate > self.spike_threshold_per_minute;
        let signal = self.matcher.matches(&message.username, &message.text);

        if !(is_spike && signal.has_signal()) {
            return AlertDecision::Suppressed(SuppressReason::NoAnomaly);
        }

        let now = message.observed_at;
        let mut last_alert_at = self.last_alert_at.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = *last_alert_at {
            let within_cooldown = match now.signed_duration_since(last).to_std() {
                Ok(elapsed) => elapsed <= self.cooldown,
                // The clock went backwards since the last alert.
                Err(_) => true,
            };
            if within_cooldown {
                return AlertDecision::Suppressed(SuppressReason::Cooldown);
            }
        }
        *last_alert_at = Some(now);
        drop(last_alert_at);

        AlertDecision::Fire(self.render(message, rate, &signal))
    }

    /// Detection time of the last fired alert, if any.
    pub fn last_alert_at(&self) -> Option<DateTime<Utc>> {
        *self.last_alert_at.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The signal matcher used by this policy.
    pub fn matcher(&self) -> &SignalMatcher {
        &self.matcher
    }

    fn render(&self, message: &ChatMessage, rate: f64, signal: &SignalMatch) -> String {
        let mut text = String::with_capacity(512);
        let _ = writeln!(text, "🚨 <b>{}</b> 🚨", escape_html(&self.title));
        text.push('\n');
        let _ = writeln!(text, "📊 <b>Message rate:</b> {rate:.1} msg/min");
        let _ = writeln!(text, "⚡ <b>Normal rate:</b> {} msg/min", self.normal_rate_per_minute);
        text.push('\n');

        if signal.target_mentioned {
            let _ = writeln!(text, "👤 <b>{} mentioned!</b>", escape_html(&self.target_identity));
        }
        if !signal.matched_keywords.is_empty() {
            let keywords = signal.matched_keywords.join(", ");
            let _ = writeln!(text, "🔑 <b>Keywords:</b> {}", escape_html(&keywords));
        }

        let excerpt = truncate_chars(&message.text, ALERT_EXCERPT_CHARS);
        let _ = write!(
            text,
            "\n💬 <b>Last message:</b> {}: {}",
            escape_html(&message.username),
            escape_html(excerpt)
        );
        let detected_at = message.observed_at.with_timezone(&Local).format("%H:%M:%S");
        let _ = write!(text, "\n\n⏰ <b>Time:</b> {detected_at}");
        if let Some(footer) = &self.footer {
            let _ = write!(text, "\n\n💰 <b>{}</b>", escape_html(footer));
        }

        text
    }
}

/// Escapes the characters Telegram's HTML parse mode treats as markup.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
