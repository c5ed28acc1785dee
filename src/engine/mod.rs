//! The detection engine: rate estimation, content signals and the alert
//! policy, driven one message at a time by the connection supervisor.

pub mod alert_policy;
pub mod detector;
pub mod rate_window;
pub mod signal_matcher;

pub use alert_policy::AlertPolicy;
pub use detector::{BurstDetector, Observation};
pub use rate_window::RateWindow;
pub use signal_matcher::SignalMatcher;
