use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical statistics record for one player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedStats {
    pub player_id: String,
    pub nickname: String,
    pub skill_level: u32,
    pub elo: u32,
    pub matches: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub rounds: u32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub kd_ratio: f64,
    pub headshot_rate: f64,
    /// Average damage per round
    pub adr: f64,
    /// Round survival/impact percentage
    pub kast: f64,
    pub rating: f64,
    pub first_kills: u32,
    pub first_deaths: u32,
    pub flash_assists: u32,
    pub utility_damage: u32,
    pub maps: BTreeMap<String, MapStats>,
    pub quality: DataQualityReport,
}

/// Per-map slice of NormalizedStats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapStats {
    pub map: String,
    pub matches: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub rounds: u32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub kd_ratio: f64,
    pub headshot_rate: f64,
    pub adr: f64,
    pub kast: f64,
    pub rating: f64,
    pub first_kills: u32,
    pub first_deaths: u32,
    pub flash_assists: u32,
    pub utility_damage: u32,
}

/// Which documents the aggregate record was built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateSource {
    /// Lifetime document only
    Lifetime,
    /// Lifetime document with totals and counters reconciled from map segments
    LifetimeWithMapTotals,
    /// No lifetime document; everything summed from map segments
    ReconstructedFromMaps,
    /// Neither lifetime nor map data was available
    #[default]
    Insufficient,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub source: AggregateSource,
    pub map_segments: usize,
    pub populated_fields: usize,
    pub total_fields: usize,
    /// `populated_fields / total_fields` as a percentage
    pub completeness: f64,
    /// Documents that were present upstream but unusable
    pub degraded: Vec<String>,
}

impl DataQualityReport {
    /// Below this completeness callers should show a limited-data notice
    pub const LIMITED_DATA_THRESHOLD: f64 = 50.0;

    pub fn is_limited(&self) -> bool {
        self.completeness < Self::LIMITED_DATA_THRESHOLD
    }
}

/// One row of a multi-player comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerComparison {
    pub player_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<NormalizedStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_serializes_with_insufficient_source() {
        let stats = NormalizedStats::default();
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["quality"]["source"], "insufficient");
        assert_eq!(json["matches"], 0);
        assert!(json["maps"].as_object().unwrap().is_empty());
    }

    #[test]
    fn limited_data_threshold() {
        let report = DataQualityReport {
            completeness: 35.0,
            ..DataQualityReport::default()
        };
        assert!(report.is_limited());

        let report = DataQualityReport {
            completeness: 90.0,
            ..DataQualityReport::default()
        };
        assert!(!report.is_limited());
    }
}
