use serde::{Deserialize, Serialize};

use super::service::DEFAULT_HISTORY_LIMIT;

/// Request payload for comparing players
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub player_ids: Vec<String>,
}

/// Query string for a match history page
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl HistoryQuery {
    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or_default()
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub player_id: String,
    pub removed: usize,
}
