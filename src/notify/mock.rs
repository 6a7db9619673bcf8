//! In-memory notifier for tests and dry runs

use std::cell::RefCell;

use super::Notifier;
use crate::error::{HeartestError, Result};

/// Records every message instead of sending it
///
/// Built with [`RecordingNotifier::failing`] it rejects every send, which
/// lets callers exercise their error paths.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RefCell<Vec<(String, String)>>,
    failure: Option<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose sends always fail with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            failure: Some(reason.into()),
        }
    }

    /// (destination, body) pairs delivered so far
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, to: &str, body: &str) -> Result<()> {
        if let Some(reason) = &self.failure {
            return Err(HeartestError::notification(reason.clone()));
        }
        self.sent
            .borrow_mut()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}
