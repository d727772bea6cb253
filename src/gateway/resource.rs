use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum_macros::EnumIter;

/// Field-keyed JSON object exactly as the upstream API returned it
pub type RawDocument = serde_json::Map<String, serde_json::Value>;

/// Upstream resources the gateway knows how to fetch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
pub enum ResourceKind {
    /// Find a player by display name
    PlayerSearch,
    Profile,
    AggregateStats,
    MatchHistory,
    MatchDetail,
    MatchStats,
}

impl ResourceKind {
    /// Stable short name used in cache keys and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::PlayerSearch => "search",
            ResourceKind::Profile => "profile",
            ResourceKind::AggregateStats => "stats",
            ResourceKind::MatchHistory => "history",
            ResourceKind::MatchDetail => "match",
            ResourceKind::MatchStats => "match_stats",
        }
    }

    /// Kinds whose id is a player id, dropped together on invalidation
    pub fn is_entity_scoped(&self) -> bool {
        matches!(
            self,
            ResourceKind::Profile | ResourceKind::AggregateStats | ResourceKind::MatchHistory
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One outbound request: what to fetch, for whom, with which query params
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub kind: ResourceKind,
    pub id: String,
    pub params: BTreeMap<String, String>,
}

impl ResourceRequest {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }

    /// Deterministic cache key: `kind:id|k1=v1&k2=v2`, params in sorted order
    pub fn cache_key(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}{}", Self::entity_prefix(self.kind, &self.id), params)
    }

    /// Prefix shared by every key for `(kind, id)` regardless of params
    pub fn entity_prefix(kind: ResourceKind, id: &str) -> String {
        format!("{}:{}|", kind.as_str(), id)
    }
}
