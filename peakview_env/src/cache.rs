//! TTL snapshot cache.
//!
//! Loads a population through a [`TrajectorySource`], keeps the resulting
//! [`Snapshot`] while it is younger than the TTL, and replaces it wholesale
//! when it expires or a refresh is requested.

use crate::context::PeakViewContext;
use crate::error::EnvError;
use crate::source::TrajectorySource;
use peakview_core::Snapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a loaded snapshot is served before reloading
    pub ttl: Duration,
    /// Upper bound on one source fetch
    pub load_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            load_timeout: Duration::from_secs(30),
        }
    }
}

struct Entry {
    snapshot: Snapshot,
    loaded_at: Duration,
}

/// Snapshot cache owned by its caller.
pub struct SnapshotCache<S, C> {
    source: S,
    ctx: Arc<C>,
    config: CacheConfig,
    entry: Option<Entry>,
    loads: u64,
}

impl<S: TrajectorySource, C: PeakViewContext> SnapshotCache<S, C> {
    pub fn new(source: S, ctx: Arc<C>) -> Self {
        Self::with_config(source, ctx, CacheConfig::default())
    }

    pub fn with_config(source: S, ctx: Arc<C>, config: CacheConfig) -> Self {
        Self {
            source,
            ctx,
            config,
            entry: None,
            loads: 0,
        }
    }

    /// Current snapshot, loading it if the cache is empty or expired.
    pub async fn get(&mut self) -> Result<Snapshot, EnvError> {
        if let Some(entry) = &self.entry {
            if self.ctx.now().saturating_sub(entry.loaded_at) < self.config.ttl {
                return Ok(Arc::clone(&entry.snapshot));
            }
            tracing::debug!(source = %self.source.describe(), "snapshot expired");
        }
        self.refresh().await
    }

    /// Forces a reload regardless of age.
    ///
    /// On failure the previous snapshot is discarded, so a later `get`
    /// retries the source.
    pub async fn refresh(&mut self) -> Result<Snapshot, EnvError> {
        self.entry = None;

        let timeout = self.config.load_timeout;
        let trajectories = tokio::time::timeout(timeout, self.source.fetch())
            .await
            .map_err(|_| EnvError::Timeout(timeout.as_millis() as u64))??;

        let snapshot: Snapshot = trajectories.into();
        self.loads += 1;
        tracing::info!(
            source = %self.source.describe(),
            count = snapshot.len(),
            loads = self.loads,
            "snapshot loaded"
        );

        self.entry = Some(Entry {
            snapshot: Arc::clone(&snapshot),
            loaded_at: self.ctx.now(),
        });
        Ok(snapshot)
    }

    /// Drops the cached snapshot without reloading.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Age of the cached snapshot, if any.
    pub fn age(&self) -> Option<Duration> {
        self.entry
            .as_ref()
            .map(|e| self.ctx.now().saturating_sub(e.loaded_at))
    }

    pub fn is_fresh(&self) -> bool {
        self.age().is_some_and(|age| age < self.config.ttl)
    }

    /// Number of successful loads so far.
    pub fn load_count(&self) -> u64 {
        self.loads
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;
    use async_trait::async_trait;
    use peakview_core::trajectory::accumulate;
    use std::sync::Mutex;
    use std::time::SystemTime;

    /// Clock that only moves when told to.
    #[derive(Default)]
    struct ManualClock {
        now: Mutex<Duration>,
    }

    impl ManualClock {
        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    #[async_trait]
    impl PeakViewContext for ManualClock {
        fn now(&self) -> Duration {
            *self.now.lock().unwrap()
        }

        fn system_time(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH + self.now()
        }

        async fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }
    }

    fn source() -> StaticSource {
        StaticSource::new(vec![
            accumulate("a", "A", "", &[(2020, 1.0, "Stage")]),
            accumulate("b", "B", "", &[(2021, 1.0, "Emploi")]),
        ])
    }

    #[tokio::test]
    async fn test_reuses_snapshot_within_ttl() {
        let clock = Arc::new(ManualClock::default());
        let mut cache = SnapshotCache::new(source(), Arc::clone(&clock));

        let first = cache.get().await.unwrap();
        clock.advance(Duration::from_secs(299));
        let second = cache.get().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.source().fetch_count(), 1);
        assert!(cache.is_fresh());
    }

    #[tokio::test]
    async fn test_reloads_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let mut cache = SnapshotCache::new(source(), Arc::clone(&clock));

        let first = cache.get().await.unwrap();
        clock.advance(Duration::from_secs(300));
        assert!(!cache.is_fresh());

        let second = cache.get().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.load_count(), 2);
        assert_eq!(cache.age(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_refresh_and_invalidate() {
        let clock = Arc::new(ManualClock::default());
        let mut cache = SnapshotCache::new(source(), clock);

        cache.get().await.unwrap();
        cache.refresh().await.unwrap();
        assert_eq!(cache.source().fetch_count(), 2);

        cache.invalidate();
        assert!(cache.age().is_none());
        cache.get().await.unwrap();
        assert_eq!(cache.source().fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let clock = Arc::new(ManualClock::default());
        let mut cache = SnapshotCache::new(StaticSource::unavailable("down"), clock);

        assert!(matches!(cache.get().await, Err(EnvError::SourceUnavailable(_))));
        assert!(cache.get().await.is_err());
        assert_eq!(cache.source().fetch_count(), 2);
        assert_eq!(cache.load_count(), 0);
    }
}
