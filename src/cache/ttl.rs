use std::collections::HashMap;
use std::time::Duration;

use crate::gateway::ResourceKind;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Time-to-live for each kind of upstream resource
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    overrides: HashMap<ResourceKind, Duration>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlPolicy {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    pub fn with_ttl(mut self, kind: ResourceKind, ttl: Duration) -> Self {
        self.overrides.insert(kind, ttl);
        self
    }

    pub fn ttl_for(&self, kind: ResourceKind) -> Duration {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Self::default_ttl(kind))
    }

    fn default_ttl(kind: ResourceKind) -> Duration {
        let secs = match kind {
            ResourceKind::PlayerSearch => 24 * HOUR,
            ResourceKind::Profile => 6 * HOUR,
            ResourceKind::AggregateStats => 30 * MINUTE,
            ResourceKind::MatchHistory => 15 * MINUTE,
            // Finished matches never change; in-progress ones refresh hourly
            ResourceKind::MatchDetail => HOUR,
            ResourceKind::MatchStats => HOUR,
        };
        Duration::from_secs(secs)
    }
}
