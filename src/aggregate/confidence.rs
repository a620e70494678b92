//! Confidence band around the final score

use crate::config::ConfidenceConfig;
use crate::utils::round2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lower: f64,
    pub upper: f64,
    pub uncertainty: f64,
}

/// Score deviation; shrinks with games played and with consistency
pub fn score_deviation(games: u32, consistency: f64, config: &ConfidenceConfig) -> f64 {
    let base = config.base_std / (1.0 + f64::from(games) / config.games_scale).sqrt();
    base * (config.consistency_offset - config.consistency_slope * consistency)
}

/// Band clamped to [0, 100]; all values rounded to two decimals
pub fn confidence_band(
    score: f64,
    games: u32,
    consistency: f64,
    config: &ConfidenceConfig,
) -> ConfidenceBand {
    let std = score_deviation(games, consistency, config);
    ConfidenceBand {
        lower: round2((score - config.z * std).max(0.0)),
        upper: round2((score + config.z * std).min(100.0)),
        uncertainty: round2(std),
    }
}
