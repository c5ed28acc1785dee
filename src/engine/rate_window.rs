//! Sliding-window message rate estimator.

use std::{collections::VecDeque, time::Duration};

use chrono::{DateTime, Utc};

/// Bounded history of observation timestamps.
///
/// At most `capacity` timestamps are retained; when full, the oldest one is
/// evicted. The rate counts the retained timestamps that fall inside
/// `[now - window, now]` and scales the count to messages per minute, so under
/// sustained traffic above `capacity` per window the estimate saturates at
/// `capacity * 60 / window_secs`.
#[derive(Debug, Clone)]
pub struct RateWindow {
    window: Duration,
    capacity: usize,
    timestamps: VecDeque<DateTime<Utc>>,
}

impl RateWindow {
    /// Creates an empty window. A zero `capacity` is treated as one.
    pub fn new(window: Duration, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { window, capacity, timestamps: VecDeque::with_capacity(capacity) }
    }

    /// Records an observation at `at`.
    ///
    /// Timestamps older than the newest recorded one are clamped to it, which
    /// keeps the history non-decreasing.
    pub fn record(&mut self, at: DateTime<Utc>) {
        let at = match self.timestamps.back() {
            Some(&newest) if at < newest => newest,
            _ => at,
        };

        // Entries past the window can never count again.
        while let Some(&oldest) = self.timestamps.front() {
            if self.in_window(oldest, at) {
                break;
            }
            self.timestamps.pop_front();
        }

        if self.timestamps.len() == self.capacity {
            self.timestamps.pop_front();
        }
        self.timestamps.push_back(at);
    }

    /// Messages per minute as of now.
    pub fn current_rate(&self) -> f64 {
        self.current_rate_at(Utc::now())
    }

    /// Messages per minute as of `now`. Zero when nothing falls in the window.
    pub fn current_rate_at(&self, now: DateTime<Utc>) -> f64 {
        let count = self.timestamps.iter().filter(|&&ts| self.in_window(ts, now)).count();
        if count == 0 {
            return 0.0;
        }
        count as f64 * 60.0 / self.window.as_secs_f64()
    }

    /// Number of retained timestamps, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The configured evaluation window.
    pub fn window(&self) -> Duration {
        self.window
    }

    fn in_window(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // `to_std` fails for negative spans, i.e. timestamps after `now`.
        match now.signed_duration_since(ts).to_std() {
            Ok(elapsed) => elapsed <= self.window,
            Err(_) => false,
        }
    }
}
