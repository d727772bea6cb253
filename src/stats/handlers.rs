use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    types::{CompareRequest, HistoryQuery, InvalidateResponse},
    NormalizedStats, PlayerComparison,
};
use crate::gateway::RawDocument;
use crate::shared::{AppError, AppState};

/// Player routes, mounted under `/players`
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/compare", post(compare_players))
        .route("/by-nickname/:nickname/stats", get(get_stats_by_nickname))
        .route("/:player_id/stats", get(get_player_stats))
        .route("/:player_id/matches", get(get_match_history))
        .route("/:player_id/cache", delete(invalidate_player_cache))
}

/// GET /players/:player_id/stats
#[instrument(name = "get_player_stats", skip(state))]
pub async fn get_player_stats(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<NormalizedStats>, AppError> {
    let stats = state.stats_service.get_normalized_stats(&player_id).await?;

    info!(
        player_id = %player_id,
        completeness = stats.quality.completeness,
        "Player stats served"
    );

    Ok(Json(stats))
}

/// GET /players/by-nickname/:nickname/stats
#[instrument(name = "get_stats_by_nickname", skip(state))]
pub async fn get_stats_by_nickname(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
) -> Result<Json<NormalizedStats>, AppError> {
    let stats = state
        .stats_service
        .get_normalized_stats_by_nickname(&nickname)
        .await?;

    Ok(Json(stats))
}

/// GET /players/:player_id/matches?offset=&limit=
#[instrument(name = "get_match_history", skip(state))]
pub async fn get_match_history(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<RawDocument>, AppError> {
    let history = state
        .stats_service
        .get_match_history(&player_id, query.offset(), query.limit())
        .await?;

    Ok(Json(history))
}

/// POST /players/compare
///
/// Body: `{ "player_ids": [...] }`. Rows come back best rating first.
#[instrument(name = "compare_players", skip(state, payload))]
pub async fn compare_players(
    State(state): State<AppState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<Vec<PlayerComparison>>, AppError> {
    let Json(request) = payload?;
    info!(players = request.player_ids.len(), "Comparing players");

    let rows = state
        .stats_service
        .compare_players(&request.player_ids)
        .await?;

    Ok(Json(rows))
}

/// DELETE /players/:player_id/cache
#[instrument(name = "invalidate_player_cache", skip(state))]
pub async fn invalidate_player_cache(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<InvalidateResponse>, AppError> {
    let removed = state.stats_service.invalidate_entity(&player_id).await?;

    Ok(Json(InvalidateResponse { player_id, removed }))
}
