use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::models::CacheEntry;
use crate::gateway::RawDocument;

/// Trait for the keyed TTL cache in front of the upstream API
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value only if present and not expired
    async fn get(&self, key: &str) -> Option<RawDocument>;
    async fn set(&self, key: &str, value: RawDocument, ttl: Duration);
    async fn invalidate(&self, key: &str) -> bool;
    async fn invalidate_prefix(&self, prefix: &str) -> usize;
    async fn purge_expired(&self) -> usize;
    async fn clear(&self);
    async fn entry_count(&self) -> usize;
}

/// In-memory implementation of CacheStore.
///
/// Staleness is bounded purely by TTL; there is no size-based eviction.
/// Expired entries stay in the map until `purge_expired` runs but are
/// never returned by `get`.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Option<RawDocument> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            _ => None,
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: RawDocument, ttl: Duration) {
        let entry = CacheEntry::new(key, value, ttl);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        debug!(ttl_secs = ttl.as_secs(), "Cached upstream document");
    }

    async fn invalidate(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    #[instrument(skip(self))]
    async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        debug!(removed, "Invalidated cache entries by prefix");
        removed
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}
