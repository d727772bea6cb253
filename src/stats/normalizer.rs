use std::collections::BTreeMap;

use tracing::debug;

use super::models::{AggregateSource, DataQualityReport, MapStats, NormalizedStats};
use super::parsing::FieldReader;
use super::rating::{rating, RatingInput};
use crate::gateway::RawDocument;

/// Number of fields in the canonical record that count toward completeness
pub const TARGET_FIELD_COUNT: usize = 20;

/// Estimated KAST above this is implausible for this data source
pub const KAST_ESTIMATE_CAP: f64 = 85.0;

const UNKNOWN_MAP: &str = "Unknown";

/// Upstream field names, first match wins
mod fields {
    pub const MATCHES: &[&str] = &["Matches", "Total Matches"];
    pub const WINS: &[&str] = &["Wins", "Total Wins"];
    pub const ROUNDS: &[&str] = &["Rounds", "Total Rounds", "Total Rounds with extended stats"];
    pub const KILLS: &[&str] = &["Kills", "Total Kills"];
    pub const DEATHS: &[&str] = &["Deaths", "Total Deaths"];
    pub const ASSISTS: &[&str] = &["Assists", "Total Assists"];
    pub const HEADSHOTS: &[&str] = &["Headshots", "Total Headshots"];
    pub const HEADSHOT_RATE: &[&str] =
        &["Average Headshots %", "Headshots %", "Total Headshots %"];
    pub const KD_RATIO: &[&str] = &["Average K/D Ratio", "K/D Ratio"];
    pub const ADR: &[&str] = &["ADR", "Average Damage per Round"];
    pub const DAMAGE: &[&str] = &["Total Damage", "Damage"];
    pub const KAST: &[&str] = &["KAST", "KAST %", "Average KAST %"];
    pub const FIRST_KILLS: &[&str] = &["First Kills", "Total Entry Wins", "Entry Wins"];
    pub const FIRST_DEATHS: &[&str] = &["First Deaths", "Total Entry Deaths", "Entry Deaths"];
    pub const FLASH_ASSISTS: &[&str] =
        &["Flash Assists", "Flash Successes", "Total Flash Successes"];
    pub const UTILITY_DAMAGE: &[&str] = &["Utility Damage", "Total Utility Damage"];

    pub const PLAYER_ID: &[&str] = &["player_id", "id"];
    pub const NICKNAME: &[&str] = &["nickname", "name"];
    pub const SKILL_LEVEL: &[&str] = &["skill_level"];
    pub const ELO: &[&str] = &["faceit_elo", "elo"];

    pub const SEGMENT_TYPE: &str = "type";
    pub const SEGMENT_LABEL: &[&str] = &["label", "map"];
    pub const SEGMENT_STATS: &str = "stats";
}

/// Builds the canonical record from profile, lifetime and segment documents
#[derive(Debug, Clone)]
pub struct StatsNormalizer {
    game_id: String,
}

impl Default for StatsNormalizer {
    fn default() -> Self {
        Self::new("cs2")
    }
}

impl StatsNormalizer {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
        }
    }

    /// Reconciles the documents into one record. Never fails: missing or
    /// unparseable fields become zero and lower the completeness score.
    pub fn normalize(
        &self,
        profile: Option<&RawDocument>,
        aggregate: Option<&RawDocument>,
        segments: &[RawDocument],
    ) -> NormalizedStats {
        let identity = profile
            .map(|document| Identity::from_profile(FieldReader::new(document), &self.game_id))
            .unwrap_or_default();

        let maps = group_map_segments(segments);
        let map_segments = maps.values().map(|group| group.segments).sum::<usize>();

        let source = match (aggregate.is_some(), map_segments > 0) {
            (true, false) => AggregateSource::Lifetime,
            (true, true) => AggregateSource::LifetimeWithMapTotals,
            (false, true) => AggregateSource::ReconstructedFromMaps,
            (false, false) => AggregateSource::Insufficient,
        };

        if source == AggregateSource::Insufficient {
            debug!("No lifetime or map data; returning zeroed record");
            return NormalizedStats {
                player_id: identity.player_id.unwrap_or_default(),
                nickname: identity.nickname.unwrap_or_default(),
                skill_level: to_count(identity.skill_level),
                elo: to_count(identity.elo),
                quality: DataQualityReport {
                    source,
                    total_fields: TARGET_FIELD_COUNT,
                    ..DataQualityReport::default()
                },
                ..NormalizedStats::default()
            };
        }

        let totals = maps
            .values()
            .fold(Counters::default(), |mut acc, group| {
                acc.merge(&group.counters);
                acc
            });
        let resolved = Resolved::aggregate(aggregate.map(FieldReader::new), &totals);

        let map_stats: BTreeMap<String, MapStats> = maps
            .into_iter()
            .filter_map(|(name, group)| {
                let scoped = Resolved::scoped(&group.counters);
                (to_count(scoped.matches) >= 1).then(|| {
                    let stats = scoped.to_map_stats(&name);
                    (name, stats)
                })
            })
            .collect();

        let populated = identity.populated()
            + resolved.populated()
            + usize::from(!map_stats.is_empty());

        let record = resolved.record();
        NormalizedStats {
            player_id: identity.player_id.unwrap_or_default(),
            nickname: identity.nickname.unwrap_or_default(),
            skill_level: to_count(identity.skill_level),
            elo: to_count(identity.elo),
            matches: record.matches,
            wins: record.wins,
            win_rate: record.win_rate,
            rounds: record.rounds,
            kills: record.kills,
            deaths: record.deaths,
            assists: record.assists,
            kd_ratio: record.kd_ratio,
            headshot_rate: record.headshot_rate,
            adr: record.adr,
            kast: record.kast,
            rating: record.rating,
            first_kills: record.first_kills,
            first_deaths: record.first_deaths,
            flash_assists: record.flash_assists,
            utility_damage: record.utility_damage,
            maps: map_stats,
            quality: DataQualityReport {
                source,
                map_segments,
                populated_fields: populated,
                total_fields: TARGET_FIELD_COUNT,
                completeness: round2(populated as f64 * 100.0 / TARGET_FIELD_COUNT as f64),
                degraded: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct Identity {
    player_id: Option<String>,
    nickname: Option<String>,
    skill_level: Option<f64>,
    elo: Option<f64>,
}

impl Identity {
    fn from_profile(reader: FieldReader<'_>, game_id: &str) -> Self {
        let game = reader.path(&["games", game_id]);
        Self {
            player_id: reader.text(fields::PLAYER_ID),
            nickname: reader.text(fields::NICKNAME),
            skill_level: game
                .and_then(|g| g.number(fields::SKILL_LEVEL))
                .or_else(|| reader.number(fields::SKILL_LEVEL)),
            elo: game
                .and_then(|g| g.number(fields::ELO))
                .or_else(|| reader.number(fields::ELO)),
        }
    }

    fn populated(&self) -> usize {
        [
            self.player_id.is_some(),
            self.nickname.is_some(),
            self.skill_level.is_some(),
            self.elo.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// Raw counters from one or more segments; `None` means no segment had the field
#[derive(Debug, Clone, Default)]
struct Counters {
    matches: Option<f64>,
    wins: Option<f64>,
    rounds: Option<f64>,
    kills: Option<f64>,
    deaths: Option<f64>,
    assists: Option<f64>,
    damage: Option<f64>,
    first_kills: Option<f64>,
    first_deaths: Option<f64>,
    flash_assists: Option<f64>,
    utility_damage: Option<f64>,
    /// Per-segment headshot percentages, zero values excluded
    headshot_rates: Vec<f64>,
    /// Per-segment ADR where total damage could not be derived
    adr_values: Vec<f64>,
    kast_values: Vec<f64>,
}

impl Counters {
    fn from_segment(reader: FieldReader<'_>) -> Self {
        let rounds = reader.number(fields::ROUNDS);
        let kills = reader.number(fields::KILLS);
        let adr = reader
            .number(fields::ADR)
            .filter(|value| *value > 0.0);
        let damage = reader
            .number(fields::DAMAGE)
            .or_else(|| Some(adr? * rounds?));

        let headshot_rate = reader.percent(fields::HEADSHOT_RATE).or_else(|| {
            let headshots = reader.number(fields::HEADSHOTS)?;
            let kills = kills.filter(|k| *k > 0.0)?;
            Some(headshots * 100.0 / kills).filter(|rate| (0.0..=100.0).contains(rate))
        });

        Self {
            matches: reader.number(fields::MATCHES),
            wins: reader.number(fields::WINS),
            rounds,
            kills,
            deaths: reader.number(fields::DEATHS),
            assists: reader.number(fields::ASSISTS),
            damage,
            first_kills: reader.number(fields::FIRST_KILLS),
            first_deaths: reader.number(fields::FIRST_DEATHS),
            flash_assists: reader.number(fields::FLASH_ASSISTS),
            utility_damage: reader.number(fields::UTILITY_DAMAGE),
            headshot_rates: headshot_rate.filter(|rate| *rate > 0.0).into_iter().collect(),
            adr_values: if damage.is_none() {
                adr.into_iter().collect()
            } else {
                Vec::new()
            },
            kast_values: reader.percent(fields::KAST).into_iter().collect(),
        }
    }

    fn merge(&mut self, other: &Counters) {
        self.matches = add(self.matches, other.matches);
        self.wins = add(self.wins, other.wins);
        self.rounds = add(self.rounds, other.rounds);
        self.kills = add(self.kills, other.kills);
        self.deaths = add(self.deaths, other.deaths);
        self.assists = add(self.assists, other.assists);
        self.damage = add(self.damage, other.damage);
        self.first_kills = add(self.first_kills, other.first_kills);
        self.first_deaths = add(self.first_deaths, other.first_deaths);
        self.flash_assists = add(self.flash_assists, other.flash_assists);
        self.utility_damage = add(self.utility_damage, other.utility_damage);
        self.headshot_rates.extend_from_slice(&other.headshot_rates);
        self.adr_values.extend_from_slice(&other.adr_values);
        self.kast_values.extend_from_slice(&other.kast_values);
    }

    fn adr(&self) -> Option<f64> {
        match (self.damage, self.rounds) {
            (Some(damage), Some(rounds)) if rounds > 0.0 => Some(damage / rounds),
            _ => mean(&self.adr_values),
        }
    }

    fn headshot_rate(&self) -> Option<f64> {
        mean(&self.headshot_rates)
    }

    fn kast(&self) -> Option<f64> {
        mean(&self.kast_values)
    }

    fn kd_ratio(&self) -> Option<f64> {
        self.kills
            .map(|kills| kills / self.deaths.unwrap_or_default().max(1.0))
    }
}

struct MapGroup {
    counters: Counters,
    segments: usize,
}

/// Map segments keyed by label; segments sharing a label are summed
fn group_map_segments(segments: &[RawDocument]) -> BTreeMap<String, MapGroup> {
    let mut groups: BTreeMap<String, MapGroup> = BTreeMap::new();

    for segment in segments {
        let reader = FieldReader::new(segment);
        if !is_map_segment(&reader) {
            continue;
        }

        let name = reader
            .text(fields::SEGMENT_LABEL)
            .unwrap_or_else(|| UNKNOWN_MAP.to_string());
        let counters =
            Counters::from_segment(reader.nested(fields::SEGMENT_STATS).unwrap_or(reader));

        groups
            .entry(name)
            .and_modify(|group| {
                group.counters.merge(&counters);
                group.segments += 1;
            })
            .or_insert(MapGroup {
                counters,
                segments: 1,
            });
    }

    groups
}

fn is_map_segment(reader: &FieldReader<'_>) -> bool {
    matches!(
        reader.raw(fields::SEGMENT_TYPE),
        Some(serde_json::Value::String(kind)) if kind.trim().eq_ignore_ascii_case("map")
    )
}

/// Field values after source priority has been applied
#[derive(Debug, Default)]
struct Resolved {
    matches: Option<f64>,
    wins: Option<f64>,
    rounds: Option<f64>,
    kills: Option<f64>,
    deaths: Option<f64>,
    assists: Option<f64>,
    kd_ratio: Option<f64>,
    headshot_rate: Option<f64>,
    adr: Option<f64>,
    kast: Option<f64>,
    first_kills: Option<f64>,
    first_deaths: Option<f64>,
    flash_assists: Option<f64>,
    utility_damage: Option<f64>,
}

impl Resolved {
    /// Segment sums win over lifetime values wherever segments carry the field
    fn aggregate(lifetime: Option<FieldReader<'_>>, totals: &Counters) -> Self {
        let life = |aliases: &[&str]| lifetime.and_then(|reader| reader.number(aliases));

        let kills = totals.kills.or_else(|| life(fields::KILLS));
        let deaths = totals.deaths.or_else(|| life(fields::DEATHS));
        let assists = totals.assists.or_else(|| life(fields::ASSISTS));
        let rounds = totals.rounds.or_else(|| life(fields::ROUNDS));

        let kd_ratio = totals
            .kd_ratio()
            .or_else(|| life(fields::KD_RATIO).filter(|kd| *kd >= 0.0))
            .or_else(|| kills.map(|k| k / deaths.unwrap_or_default().max(1.0)));

        let headshot_rate = totals.headshot_rate().or_else(|| {
            lifetime.and_then(|reader| reader.percent(fields::HEADSHOT_RATE))
        });

        let adr = life(fields::ADR)
            .filter(|adr| *adr > 0.0)
            .or_else(|| totals.adr());

        let kast = lifetime
            .and_then(|reader| reader.percent(fields::KAST))
            .or_else(|| totals.kast())
            .or_else(|| estimate_kast(rounds, kills, deaths, assists));

        Self {
            matches: totals.matches.or_else(|| life(fields::MATCHES)),
            wins: totals.wins.or_else(|| life(fields::WINS)),
            rounds,
            kills,
            deaths,
            assists,
            kd_ratio,
            headshot_rate,
            adr,
            kast,
            first_kills: totals.first_kills.or_else(|| life(fields::FIRST_KILLS)),
            first_deaths: totals.first_deaths.or_else(|| life(fields::FIRST_DEATHS)),
            flash_assists: totals.flash_assists.or_else(|| life(fields::FLASH_ASSISTS)),
            utility_damage: totals
                .utility_damage
                .or_else(|| life(fields::UTILITY_DAMAGE)),
        }
    }

    /// Same rules as `aggregate`, restricted to one map's counters
    fn scoped(counters: &Counters) -> Self {
        Self {
            matches: counters.matches,
            wins: counters.wins,
            rounds: counters.rounds,
            kills: counters.kills,
            deaths: counters.deaths,
            assists: counters.assists,
            kd_ratio: counters.kd_ratio(),
            headshot_rate: counters.headshot_rate(),
            adr: counters.adr(),
            kast: counters.kast().or_else(|| {
                estimate_kast(
                    counters.rounds,
                    counters.kills,
                    counters.deaths,
                    counters.assists,
                )
            }),
            first_kills: counters.first_kills,
            first_deaths: counters.first_deaths,
            flash_assists: counters.flash_assists,
            utility_damage: counters.utility_damage,
        }
    }

    fn rating_input(&self) -> RatingInput {
        RatingInput {
            rounds: non_negative(self.rounds),
            kills: non_negative(self.kills),
            deaths: non_negative(self.deaths),
            assists: non_negative(self.assists),
            kast: self.kast.unwrap_or_default().clamp(0.0, 100.0),
            adr: non_negative(self.adr),
            first_kills: self.first_kills.map(|v| v.max(0.0)),
            first_deaths: self.first_deaths.map(|v| v.max(0.0)),
            flash_assists: non_negative(self.flash_assists),
            utility_damage: non_negative(self.utility_damage),
        }
    }

    /// Counts populated fields among the 15 stat fields of the record
    fn populated(&self) -> usize {
        let has_rounds = self.rounds.is_some_and(|rounds| rounds >= 1.0);
        // Win rate is derivable whenever matches are known (0 when matches is 0)
        let has_win_rate = self.matches.is_some();
        [
            self.matches.is_some(),
            self.wins.is_some(),
            has_win_rate,
            self.kills.is_some(),
            self.deaths.is_some(),
            self.assists.is_some(),
            self.kd_ratio.is_some(),
            self.headshot_rate.is_some(),
            self.adr.is_some(),
            self.kast.is_some(),
            has_rounds,
            self.first_kills.is_some(),
            self.first_deaths.is_some(),
            self.flash_assists.is_some(),
            self.utility_damage.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    fn record(&self) -> MapStats {
        self.to_map_stats("")
    }

    fn to_map_stats(&self, map: &str) -> MapStats {
        let matches = to_count(self.matches);
        let wins = to_count(self.wins).min(matches);
        let win_rate = if matches > 0 {
            round2(f64::from(wins) * 100.0 / f64::from(matches))
        } else {
            0.0
        };

        MapStats {
            map: map.to_string(),
            matches,
            wins,
            win_rate: clamp_percent(win_rate),
            rounds: to_count(self.rounds),
            kills: to_count(self.kills),
            deaths: to_count(self.deaths),
            assists: to_count(self.assists),
            kd_ratio: round2(non_negative(self.kd_ratio)),
            headshot_rate: clamp_percent(round2(self.headshot_rate.unwrap_or_default())),
            adr: round2(non_negative(self.adr)),
            kast: clamp_percent(round2(self.kast.unwrap_or_default())),
            rating: rating(&self.rating_input()),
            first_kills: to_count(self.first_kills),
            first_deaths: to_count(self.first_deaths),
            flash_assists: to_count(self.flash_assists),
            utility_damage: to_count(self.utility_damage),
        }
    }
}

/// Conservative KAST estimate from counters, capped at `KAST_ESTIMATE_CAP`
pub fn estimate_kast(
    rounds: Option<f64>,
    kills: Option<f64>,
    deaths: Option<f64>,
    assists: Option<f64>,
) -> Option<f64> {
    let rounds = rounds.filter(|r| r.is_finite() && *r >= 1.0)?;
    let survival = ((rounds - non_negative(deaths)).max(0.0) / rounds).min(1.0);
    let involvement = ((non_negative(kills) + non_negative(assists)) / rounds).min(1.0);
    let estimate = 100.0 * (survival + 0.5 * involvement * (1.0 - survival));
    Some(estimate.clamp(0.0, KAST_ESTIMATE_CAP))
}

fn add(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (x, None) => x,
        (None, y) => y,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    value.unwrap_or_default().max(0.0)
}

fn to_count(value: Option<f64>) -> u32 {
    // Float-to-int `as` saturates, so huge values clamp to u32::MAX
    non_negative(value).round() as u32
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
