use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{NormalizedStats, PlayerComparison},
    normalizer::StatsNormalizer,
    parsing::FieldReader,
    DataQualityReport, StatsError,
};
use crate::gateway::{Gateway, GatewayError, RawDocument, ResourceKind, ResourceRequest};

/// Upper bound on players in one comparison
pub const MAX_COMPARE_PLAYERS: usize = 10;
/// Upper bound on the match history page size
pub const MAX_HISTORY_LIMIT: u32 = 100;
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

pub struct StatsService {
    gateway: Arc<Gateway>,
    normalizer: StatsNormalizer,
}

impl StatsService {
    pub fn builder(gateway: Arc<Gateway>) -> StatsServiceBuilder {
        StatsServiceBuilder::new(gateway)
    }

    pub fn gateway(&self) -> Arc<Gateway> {
        self.gateway.clone()
    }

    /// Profile and lifetime stats for one player, reconciled into one record.
    ///
    /// A malformed document is treated as absent and listed in
    /// `quality.degraded`; every other gateway failure is returned.
    #[instrument(skip(self))]
    pub async fn get_normalized_stats(&self, player_id: &str) -> Result<NormalizedStats, StatsError> {
        validate_id("player id", player_id)?;

        let (profile, aggregate) = tokio::join!(
            self.gateway
                .fetch(ResourceKind::Profile, player_id, BTreeMap::new()),
            self.gateway
                .fetch(ResourceKind::AggregateStats, player_id, BTreeMap::new()),
        );

        let mut degraded = Vec::new();
        let profile = tolerate_malformed(profile, &mut degraded)?;
        let aggregate = tolerate_malformed(aggregate, &mut degraded)?;

        let (lifetime, segments) = match aggregate.as_ref() {
            Some(document) => split_aggregate(document, &mut degraded),
            None => (None, Vec::new()),
        };

        let stats = self
            .normalizer
            .normalize(profile.as_ref(), lifetime, &segments);

        debug!(
            source = ?stats.quality.source,
            completeness = stats.quality.completeness,
            maps = stats.maps.len(),
            "Normalized player stats"
        );

        Ok(NormalizedStats {
            quality: DataQualityReport {
                degraded,
                ..stats.quality
            },
            ..stats
        })
    }

    /// Raw search result for a nickname
    #[instrument(skip(self))]
    pub async fn find_player(&self, nickname: &str) -> Result<RawDocument, StatsError> {
        validate_id("nickname", nickname)?;
        Ok(self
            .gateway
            .fetch(ResourceKind::PlayerSearch, nickname.trim(), BTreeMap::new())
            .await?)
    }

    pub async fn get_normalized_stats_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<NormalizedStats, StatsError> {
        let player = self.find_player(nickname).await?;
        let player_id = FieldReader::new(&player)
            .text(&["player_id"])
            .ok_or_else(|| StatsError::UnresolvedPlayer(nickname.to_string()))?;

        self.get_normalized_stats(&player_id).await
    }

    /// One page of the player's match history, passed through as-is
    #[instrument(skip(self))]
    pub async fn get_match_history(
        &self,
        player_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<RawDocument, StatsError> {
        validate_id("player id", player_id)?;
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(StatsError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }

        let request = ResourceRequest::new(ResourceKind::MatchHistory, player_id)
            .with_param("offset", offset.to_string())
            .with_param("limit", limit.to_string());
        Ok(self.gateway.fetch_request(request).await?)
    }

    pub async fn get_match_detail(&self, match_id: &str) -> Result<RawDocument, StatsError> {
        validate_id("match id", match_id)?;
        Ok(self
            .gateway
            .fetch(ResourceKind::MatchDetail, match_id, BTreeMap::new())
            .await?)
    }

    pub async fn get_match_stats(&self, match_id: &str) -> Result<RawDocument, StatsError> {
        validate_id("match id", match_id)?;
        Ok(self
            .gateway
            .fetch(ResourceKind::MatchStats, match_id, BTreeMap::new())
            .await?)
    }

    /// Normalized stats for several players, best rating first.
    ///
    /// Lookups run concurrently under the gateway's global limit. Players
    /// that could not be fetched keep their error and sort last.
    #[instrument(skip(self, player_ids), fields(players = player_ids.len()))]
    pub async fn compare_players(
        &self,
        player_ids: &[String],
    ) -> Result<Vec<PlayerComparison>, StatsError> {
        let mut unique: Vec<&str> = Vec::with_capacity(player_ids.len());
        for id in player_ids.iter().map(|id| id.trim()) {
            validate_id("player id", id)?;
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() || unique.len() > MAX_COMPARE_PLAYERS {
            return Err(StatsError::Validation(format!(
                "between 1 and {} players can be compared",
                MAX_COMPARE_PLAYERS
            )));
        }

        let results = join_all(unique.iter().map(|id| self.get_normalized_stats(id))).await;

        let (mut found, failed): (Vec<PlayerComparison>, Vec<PlayerComparison>) = unique
            .iter()
            .zip(results)
            .map(|(id, result)| match result {
                Ok(stats) => PlayerComparison {
                    player_id: id.to_string(),
                    stats: Some(stats),
                    error: None,
                },
                Err(err) => {
                    warn!(player_id = %id, error = %err, "Comparison lookup failed");
                    PlayerComparison {
                        player_id: id.to_string(),
                        stats: None,
                        error: Some(err.to_string()),
                    }
                }
            })
            .partition(|row| row.stats.is_some());

        found.sort_by(|a, b| rating_of(b).total_cmp(&rating_of(a)));
        found.extend(failed);
        Ok(found)
    }

    pub async fn get_raw_cached(&self, kind: ResourceKind, id: &str) -> Option<RawDocument> {
        self.gateway.get_raw_cached(kind, id).await
    }

    pub async fn invalidate_entity(&self, player_id: &str) -> Result<usize, StatsError> {
        validate_id("player id", player_id)?;
        let removed = self.gateway.invalidate_entity(player_id).await;
        info!(player_id = %player_id, removed, "Player cache invalidated");
        Ok(removed)
    }
}

fn rating_of(row: &PlayerComparison) -> f64 {
    row.stats.as_ref().map(|s| s.rating).unwrap_or_default()
}

fn validate_id(field: &str, value: &str) -> Result<(), StatsError> {
    if value.trim().is_empty() {
        return Err(StatsError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn tolerate_malformed(
    result: Result<RawDocument, GatewayError>,
    degraded: &mut Vec<String>,
) -> Result<Option<RawDocument>, StatsError> {
    match result {
        Ok(document) => Ok(Some(document)),
        Err(GatewayError::MalformedResponse { kind, reason }) => {
            warn!(kind = %kind, reason = %reason, "Treating malformed document as absent");
            degraded.push(kind.to_string());
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Splits the stats document into its lifetime object and segment list
fn split_aggregate<'a>(
    document: &'a RawDocument,
    degraded: &mut Vec<String>,
) -> (Option<&'a RawDocument>, Vec<RawDocument>) {
    let lifetime = match document.get("lifetime") {
        Some(Value::Object(lifetime)) => Some(lifetime),
        None => None,
        Some(_) => {
            degraded.push("stats.lifetime".to_string());
            None
        }
    };

    let segments = match document.get("segments") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                Value::Object(segment) => Some(segment.clone()),
                _ => {
                    degraded.push(format!("stats.segments[{}]", index));
                    None
                }
            })
            .collect(),
        None => Vec::new(),
        Some(_) => {
            degraded.push("stats.segments".to_string());
            Vec::new()
        }
    };

    (lifetime, segments)
}

pub struct StatsServiceBuilder {
    gateway: Arc<Gateway>,
    game_id: String,
}

impl StatsServiceBuilder {
    fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            game_id: "cs2".to_string(),
        }
    }

    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = game_id.into();
        self
    }

    pub fn build(self) -> StatsService {
        StatsService {
            gateway: self.gateway,
            normalizer: StatsNormalizer::new(self.game_id),
        }
    }
}
