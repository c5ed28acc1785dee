use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::notification::{NotificationError, NotificationSink};

/// A `NotificationSink` that records every delivered alert.
#[derive(Clone, Default)]
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingSink {
    /// Creates a sink whose deliveries succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink whose deliveries are recorded and then fail.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Alerts delivered so far.
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, text: &str) -> Result<(), NotificationError> {
        self.delivered.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(NotificationError::NotifyFailed("recording sink set to fail".into()));
        }
        Ok(())
    }
}
