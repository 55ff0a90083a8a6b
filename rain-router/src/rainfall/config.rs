//! Configuration for the rainfall snapshot provider.

use std::path::PathBuf;
use std::time::Duration;

/// Default address prefix of the rainfall source.
const DEFAULT_SOURCE_PREFIX: &str = "http://127.0.0.1:8081/radar/";

/// Configuration for fetching and caching rainfall snapshots.
#[derive(Debug, Clone)]
pub struct RainfallConfig {
    /// Snapshots are fetched from `source_prefix + key + ".txt"`.
    pub source_prefix: String,

    /// Bound on a single fetch attempt.
    pub timeout: Duration,

    /// Extra attempts after a failed fetch. Zero means a single attempt.
    pub retries: u32,

    /// Pause between attempts.
    pub retry_backoff: Duration,

    /// Directory holding one `<key>.txt` file per snapshot.
    /// `None` keeps snapshots in memory only.
    pub cache_dir: Option<PathBuf>,

    /// Requested times are floored to this many minutes before keying.
    pub bucket_mins: u32,

    /// Bound on in-memory snapshots. `None` retains every snapshot.
    pub max_capacity: Option<u64>,
}

impl RainfallConfig {
    pub fn new(source_prefix: impl Into<String>) -> Self {
        Self {
            source_prefix: source_prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_bucket_mins(mut self, mins: u32) -> Self {
        self.bucket_mins = mins;
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }
}

impl Default for RainfallConfig {
    fn default() -> Self {
        Self {
            source_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            timeout: Duration::from_secs(10),
            retries: 0,
            retry_backoff: Duration::from_millis(500),
            cache_dir: None,
            bucket_mins: 1,
            max_capacity: None,
        }
    }
}
