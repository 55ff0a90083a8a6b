//! Time-indexed, cached access to rainfall snapshots.
//!
//! Snapshots are keyed by the requested [`TimePoint`]'s canonical key and
//! resolved in three tiers:
//!
//! 1. In-memory cache (shared by all requests)
//! 2. Local cache directory, one `<key>.txt` file per snapshot
//! 3. The remote source, written through to the local directory
//!
//! Concurrent requests for the same missing key share a single fetch, and a
//! failed fetch is never cached, so a later request may still succeed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::{debug, info, warn};

use crate::domain::TimePoint;

use super::config::RainfallConfig;
use super::error::{NotAvailable, RainfallError};
use super::grid::GridSpec;
use super::matrix::RainfallMatrix;
use super::source::RainfallSource;

/// Rainfall snapshots by time, cached in memory and on disk.
pub struct RainfallGridProvider<S> {
    source: S,
    grid: GridSpec,
    config: RainfallConfig,
    snapshots: MokaCache<String, Arc<RainfallMatrix>>,
}

impl<S: RainfallSource> RainfallGridProvider<S> {
    /// Create a provider over `source` for a raster georeferenced by `grid`.
    pub fn new(source: S, config: RainfallConfig, grid: GridSpec) -> Self {
        let mut builder = MokaCache::builder();
        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        Self {
            source,
            grid,
            config,
            snapshots: builder.build(),
        }
    }

    /// The raster georeferencing used for hazard sampling.
    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Access the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The cache key a request for `point` resolves to.
    pub fn key_for(&self, point: &TimePoint) -> String {
        point.floor_to(self.config.bucket_mins).key()
    }

    /// Whether the snapshot for `point` is held in memory.
    #[cfg(test)]
    fn is_cached(&self, point: &TimePoint) -> bool {
        self.snapshots.contains_key(&self.key_for(point))
    }

    /// The rainfall matrix for `point`.
    ///
    /// Any failure (timeout, error status, malformed body, I/O) yields
    /// [`NotAvailable`]; callers are expected to degrade rather than fail.
    pub async fn fetch(&self, point: &TimePoint) -> Result<Arc<RainfallMatrix>, NotAvailable> {
        let key = self.key_for(point);

        if let Some(matrix) = self.snapshots.get(&key).await {
            debug!(%key, "rainfall snapshot served from memory");
            return Ok(matrix);
        }

        let load = self.load(&key);
        self.snapshots
            .try_get_with(key.clone(), load)
            .await
            .map_err(|cause| {
                warn!(%key, error = %cause, "rainfall snapshot not available");
                NotAvailable { key, cause }
            })
    }

    /// Resolve a key that is not in memory: disk first, then the source.
    async fn load(&self, key: &str) -> Result<Arc<RainfallMatrix>, RainfallError> {
        if let Some(matrix) = self.read_cached_file(key).await {
            debug!(%key, "rainfall snapshot served from cache directory");
            return Ok(Arc::new(matrix));
        }

        let body = self.fetch_with_retries(key).await?;
        let matrix = RainfallMatrix::parse(&body)?;
        info!(
            %key,
            rows = matrix.rows(),
            cols = matrix.cols(),
            "fetched rainfall snapshot"
        );

        if let Err(e) = self.write_cached_file(key, &body).await {
            warn!(%key, error = %e, "failed to persist rainfall snapshot");
        }

        Ok(Arc::new(matrix))
    }

    async fn fetch_with_retries(&self, key: &str) -> Result<String, RainfallError> {
        let mut attempt = 0;
        loop {
            match self.source.fetch_raw(key).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.config.retries => {
                    attempt += 1;
                    warn!(%key, attempt, error = %e, "rainfall fetch failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn cache_path(&self, key: &str) -> Option<PathBuf> {
        self.config
            .cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{key}.txt")))
    }

    /// A cached file that fails to parse is treated as absent.
    async fn read_cached_file(&self, key: &str) -> Option<RainfallMatrix> {
        let path = self.cache_path(key)?;
        let body = tokio::fs::read_to_string(&path).await.ok()?;
        match RainfallMatrix::parse(&body) {
            Ok(matrix) => Some(matrix),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cached snapshot");
                None
            }
        }
    }

    /// Write via a temporary file and rename, so a reader never observes a
    /// partially written snapshot.
    async fn write_cached_file(&self, key: &str, body: &str) -> Result<(), RainfallError> {
        let Some(path) = self.cache_path(key) else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let partial = partial_path(&path);
        tokio::fs::write(&partial, body).await?;
        tokio::fs::rename(&partial, &path).await?;
        Ok(())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rainfall::MockRainfallSource;
    use std::time::Duration;
    use tempfile::tempdir;

    const KEY: &str = "202401151345";
    const BODY: &str = "0 1 2\n-99 40 5\n";

    fn point() -> TimePoint {
        TimePoint::at(2024, 1, 15, 13, 45).unwrap()
    }

    fn provider(
        source: MockRainfallSource,
        config: RainfallConfig,
    ) -> RainfallGridProvider<MockRainfallSource> {
        RainfallGridProvider::new(source, config, GridSpec::default())
    }

    #[tokio::test]
    async fn cache_hit_avoids_refetch() {
        let p = provider(
            MockRainfallSource::new().with_snapshot(KEY, BODY),
            RainfallConfig::default(),
        );

        let first = p.fetch(&point()).await.unwrap();
        let second = p.fetch(&point()).await.unwrap();

        assert_eq!(p.source().call_count(), 1);
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.row(1), Some(&[0, 40, 5][..]));
    }

    #[tokio::test]
    async fn seconds_do_not_change_the_snapshot() {
        let p = provider(
            MockRainfallSource::new().with_snapshot(KEY, BODY),
            RainfallConfig::default(),
        );
        let with_seconds = TimePoint::new(2024, 1, 15, 13, 45, 59).unwrap();

        p.fetch(&point()).await.unwrap();
        p.fetch(&with_seconds).await.unwrap();
        assert_eq!(p.source().call_count(), 1);
    }

    #[tokio::test]
    async fn missing_snapshot_is_not_available_and_not_cached() {
        let p = provider(MockRainfallSource::new(), RainfallConfig::default());

        let err = p.fetch(&point()).await.unwrap_err();
        assert_eq!(err.key, KEY);
        assert!(matches!(*err.cause, RainfallError::Status { status: 404, .. }));
        assert!(!p.is_cached(&point()));

        // A failed fetch is retried by the next request.
        assert!(p.fetch(&point()).await.is_err());
        assert_eq!(p.source().call_count(), 2);
    }

    #[tokio::test]
    async fn malformed_body_is_not_available() {
        let p = provider(
            MockRainfallSource::new().with_snapshot(KEY, "1 2\n3\n"),
            RainfallConfig::default(),
        );
        let err = p.fetch(&point()).await.unwrap_err();
        assert!(matches!(*err.cause, RainfallError::Malformed { .. }));
    }

    #[tokio::test]
    async fn retries_are_configurable() {
        let p = provider(
            MockRainfallSource::new(),
            RainfallConfig::default().with_retries(2, Duration::from_millis(1)),
        );
        assert!(p.fetch(&point()).await.is_err());
        assert_eq!(p.source().call_count(), 3);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let p = provider(
            MockRainfallSource::new()
                .with_snapshot(KEY, BODY)
                .with_delay(Duration::from_millis(50)),
            RainfallConfig::default(),
        );
        let t = point();

        let results = futures::future::join_all((0..8).map(|_| p.fetch(&t))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(p.source().call_count(), 1);
    }

    #[tokio::test]
    async fn snapshots_are_written_through_to_cache_dir() {
        let dir = tempdir().unwrap();
        let config = RainfallConfig::default().with_cache_dir(dir.path());

        let p = provider(MockRainfallSource::new().with_snapshot(KEY, BODY), config.clone());
        p.fetch(&point()).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join(format!("{KEY}.txt"))).unwrap();
        assert_eq!(written, BODY);
        assert!(!dir.path().join(format!("{KEY}.txt.part")).exists());

        // A fresh provider (empty memory) is served from disk without a fetch.
        let fresh = provider(MockRainfallSource::new(), config);
        let matrix = fresh.fetch(&point()).await.unwrap();
        assert_eq!(fresh.source().call_count(), 0);
        assert_eq!(matrix.get(1, 1), Some(40));
    }

    #[tokio::test]
    async fn corrupt_cache_file_is_refetched() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(format!("{KEY}.txt")), "garbage").unwrap();
        let config = RainfallConfig::default().with_cache_dir(dir.path());

        let p = provider(MockRainfallSource::new().with_snapshot(KEY, BODY), config);
        let matrix = p.fetch(&point()).await.unwrap();

        assert_eq!(p.source().call_count(), 1);
        assert_eq!(matrix.rows(), 2);
        let rewritten = std::fs::read_to_string(dir.path().join(format!("{KEY}.txt"))).unwrap();
        assert_eq!(rewritten, BODY);
    }

    #[tokio::test]
    async fn bucketing_shares_snapshots_within_a_bucket() {
        let p = provider(
            MockRainfallSource::new().with_snapshot("202401151340", BODY),
            RainfallConfig::default().with_bucket_mins(10),
        );
        let a = TimePoint::at(2024, 1, 15, 13, 41).unwrap();
        let b = TimePoint::at(2024, 1, 15, 13, 49).unwrap();

        assert_eq!(p.key_for(&a), "202401151340");
        p.fetch(&a).await.unwrap();
        p.fetch(&b).await.unwrap();
        assert_eq!(p.source().call_count(), 1);
    }

    #[test]
    fn partial_path_appends_suffix() {
        let p = partial_path(Path::new("/cache/202401011200.txt"));
        assert_eq!(p, PathBuf::from("/cache/202401011200.txt.part"));
    }
}
