use std::time::Duration;
use tokio::time::Instant;

use crate::gateway::RawDocument;

/// A cached upstream document and the instant it stops being servable
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: RawDocument,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: RawDocument, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}
