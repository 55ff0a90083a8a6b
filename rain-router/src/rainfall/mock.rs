//! In-memory rainfall source for tests and offline development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::error::RainfallError;
use super::source::RainfallSource;

/// Serves fixed snapshot bodies by key and counts how often it is asked.
///
/// Unknown keys answer like a missing remote file (status 404).
#[derive(Debug, Default)]
pub struct MockRainfallSource {
    bodies: HashMap<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockRainfallSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `key`.
    pub fn with_snapshot(mut self, key: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(key.into(), body.into());
        self
    }

    /// Sleep before answering, to widen race windows in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RainfallSource for MockRainfallSource {
    async fn fetch_raw(&self, key: &str) -> Result<String, RainfallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.bodies
            .get(key)
            .cloned()
            .ok_or_else(|| RainfallError::Status {
                status: 404,
                url: format!("mock://{key}.txt"),
            })
    }
}
