use serde_json::{json, Value};

// ============================================================================
// Upstream document builders
// ============================================================================

pub fn profile(player_id: &str, nickname: &str, elo: u32) -> String {
    json!({
        "player_id": player_id,
        "nickname": nickname,
        "country": "se",
        "games": { "cs2": { "skill_level": 10, "faceit_elo": elo } }
    })
    .to_string()
}

/// Map segment in the upstream layout, every value stringified
pub fn map_segment(label: &str, stats: &[(&str, f64)]) -> Value {
    let stats: serde_json::Map<String, Value> = stats
        .iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    json!({ "label": label, "type": "Map", "mode": "5v5", "stats": stats })
}

/// Builds the aggregate stats document: lifetime block plus segments
pub struct StatsDocument {
    lifetime: Option<Value>,
    segments: Vec<Value>,
}

impl StatsDocument {
    pub fn new() -> Self {
        Self {
            lifetime: None,
            segments: Vec::new(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Value) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_map(mut self, label: &str, stats: &[(&str, f64)]) -> Self {
        self.segments.push(map_segment(label, stats));
        self
    }

    pub fn with_segment(mut self, segment: Value) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn build(self) -> String {
        let mut document = serde_json::Map::new();
        if let Some(lifetime) = self.lifetime {
            document.insert("lifetime".to_string(), lifetime);
        }
        document.insert("segments".to_string(), Value::Array(self.segments));
        Value::Object(document).to_string()
    }
}

impl Default for StatsDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// A realistic two-map player: 45 matches, 27 wins
pub fn regular_player_stats() -> String {
    StatsDocument::new()
        .with_lifetime(json!({
            "Matches": "50",
            "Wins": "50",
            "Average K/D Ratio": "1.9",
            "Average Headshots %": "44",
            "ADR": "82,4",
            "KAST": "71%"
        }))
        .with_map(
            "de_mirage",
            &[
                ("Matches", 20.0),
                ("Wins", 12.0),
                ("Rounds", 420.0),
                ("Kills", 380.0),
                ("Deaths", 300.0),
                ("Assists", 90.0),
                ("Average Headshots %", 48.0),
                ("First Kills", 60.0),
                ("First Deaths", 45.0),
            ],
        )
        .with_map(
            "de_inferno",
            &[
                ("Matches", 25.0),
                ("Wins", 15.0),
                ("Rounds", 530.0),
                ("Kills", 450.0),
                ("Deaths", 410.0),
                ("Assists", 120.0),
                ("Average Headshots %", 52.0),
                ("First Kills", 70.0),
                ("First Deaths", 66.0),
            ],
        )
        .with_segment(json!({
            "label": "5v5",
            "type": "Mode",
            "stats": { "Matches": "999" }
        }))
        .build()
}
