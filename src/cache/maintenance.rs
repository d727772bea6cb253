use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

use super::store::CacheStore;

/// Configuration for the cache maintenance task
#[derive(Debug, Clone)]
pub struct CacheMaintenanceConfig {
    /// How often expired entries are purged
    pub purge_interval: Duration,
}

impl Default for CacheMaintenanceConfig {
    fn default() -> Self {
        let secs = std::env::var("STATS_CACHE_PURGE_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(5 * 60);

        Self {
            purge_interval: Duration::from_secs(secs.max(1)),
        }
    }
}

/// Periodically drops expired cache entries so memory tracks the live set.
///
/// Runs until the surrounding task is aborted.
#[instrument(skip(cache))]
pub async fn start_cache_maintenance(cache: Arc<dyn CacheStore>, config: CacheMaintenanceConfig) {
    info!(
        purge_interval_secs = config.purge_interval.as_secs(),
        "Starting cache maintenance background task"
    );

    let mut purge_interval = interval(config.purge_interval);
    purge_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    purge_interval.tick().await;

    loop {
        purge_interval.tick().await;

        let purged = cache.purge_expired().await;
        let remaining = cache.entry_count().await;
        if purged > 0 {
            info!(purged, remaining, "Purged expired cache entries");
        } else {
            debug!(remaining, "No expired cache entries to purge");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::gateway::RawDocument;

    #[tokio::test(start_paused = true)]
    async fn purges_expired_entries_on_each_tick() {
        let cache = Arc::new(InMemoryCacheStore::new());
        cache
            .set("short", RawDocument::new(), Duration::from_secs(30))
            .await;
        cache
            .set("long", RawDocument::new(), Duration::from_secs(3600))
            .await;

        let config = CacheMaintenanceConfig {
            purge_interval: Duration::from_secs(60),
        };
        let handle = tokio::spawn(start_cache_maintenance(cache.clone(), config));

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(cache.entry_count().await, 1);
        assert!(cache.get("long").await.is_some());

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn leaves_live_entries_alone() {
        let cache = Arc::new(InMemoryCacheStore::new());
        cache
            .set("live", RawDocument::new(), Duration::from_secs(3600))
            .await;

        let config = CacheMaintenanceConfig {
            purge_interval: Duration::from_secs(10),
        };
        let handle = tokio::spawn(start_cache_maintenance(cache.clone(), config));

        tokio::time::sleep(Duration::from_secs(35)).await;

        assert_eq!(cache.entry_count().await, 1);
        handle.abort();
    }
}
