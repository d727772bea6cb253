use serde::{Deserialize, Serialize};

/// Weighted-linear composite rating coefficients
pub mod coefficients {
    pub const KAST: f64 = 0.0073;
    pub const KPR: f64 = 0.3591;
    pub const DPR: f64 = -0.5329;
    pub const IMPACT: f64 = 0.2372;
    pub const ADR: f64 = 0.0032;
    pub const INTERCEPT: f64 = 0.1587;

    pub const IMPACT_KPR: f64 = 2.13;
    pub const IMPACT_APR: f64 = 0.42;
    pub const IMPACT_INTERCEPT: f64 = -0.41;
    /// Weight of the per-round opening-duel differential inside impact
    pub const IMPACT_ENTRY: f64 = 0.1;

    pub const FLASH_ASSIST_PER_ROUND: f64 = 0.05;
    pub const UTILITY_DAMAGE_PER_ROUND: f64 = 0.001;
    pub const UTILITY_BONUS_CAP: f64 = 0.05;
}

/// Per-round counters the rating is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingInput {
    pub rounds: f64,
    pub kills: f64,
    pub deaths: f64,
    pub assists: f64,
    /// Round survival/impact percentage, 0-100
    pub kast: f64,
    pub adr: f64,
    pub first_kills: Option<f64>,
    pub first_deaths: Option<f64>,
    pub flash_assists: f64,
    pub utility_damage: f64,
}

impl RatingInput {
    fn is_consistent(&self) -> bool {
        let values = [
            self.rounds,
            self.kills,
            self.deaths,
            self.assists,
            self.kast,
            self.adr,
            self.flash_assists,
            self.utility_damage,
            self.first_kills.unwrap_or_default(),
            self.first_deaths.unwrap_or_default(),
        ];
        self.rounds >= 1.0 && values.iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Composite performance rating, floored at 0 and rounded to 3 decimals.
///
/// Returns 0.0 for fewer than one round or any non-finite/negative input.
pub fn rating(input: &RatingInput) -> f64 {
    use coefficients::*;

    if !input.is_consistent() {
        return 0.0;
    }

    let rounds = input.rounds;
    let kpr = input.kills / rounds;
    let dpr = input.deaths / rounds;
    let apr = input.assists / rounds;

    let entry = match (input.first_kills, input.first_deaths) {
        (Some(first_kills), Some(first_deaths)) => {
            IMPACT_ENTRY * (first_kills - first_deaths) / rounds
        }
        _ => 0.0,
    };
    let impact = IMPACT_KPR * kpr + IMPACT_APR * apr + IMPACT_INTERCEPT + entry;

    let base = KAST * input.kast
        + KPR * kpr
        + DPR * dpr
        + IMPACT * impact
        + ADR * input.adr
        + INTERCEPT;

    let utility_bonus = (FLASH_ASSIST_PER_ROUND * input.flash_assists / rounds
        + UTILITY_DAMAGE_PER_ROUND * input.utility_damage / rounds)
        .min(UTILITY_BONUS_CAP);

    let value = (base + utility_bonus).max(0.0);
    if !value.is_finite() {
        return 0.0;
    }
    (value * 1000.0).round() / 1000.0
}
