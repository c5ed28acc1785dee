//! Outcome of an alert evaluation.

use std::fmt;

/// Why an evaluation did not produce an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// The rate is not a spike, or the message carries no signal.
    NoAnomaly,
    /// A previous alert fired within the cooldown period.
    Cooldown,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressReason::NoAnomaly => f.write_str("no anomaly"),
            SuppressReason::Cooldown => f.write_str("cooldown"),
        }
    }
}

/// Go/no-go decision for a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertDecision {
    /// No alert is emitted.
    Suppressed(SuppressReason),
    /// An alert is emitted with the rendered text.
    Fire(String),
}

impl AlertDecision {
    /// Returns true for [`AlertDecision::Fire`].
    pub fn is_fire(&self) -> bool {
        matches!(self, AlertDecision::Fire(_))
    }
}
