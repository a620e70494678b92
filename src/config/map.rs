//! Map-restricted rating configuration

use crate::error::{RankingError, Result};
use serde::{Deserialize, Serialize};

/// Blend weights of the per-map rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapWeights {
    pub colley: f64,
    pub massey: f64,
    pub elo: f64,
    pub elo_mov: f64,
    pub trueskill: f64,
    pub pagerank: f64,
    pub bradley_terry: f64,
    pub sos: f64,
    pub consistency: f64,
    /// Weight of the mean of all nine signals
    pub signal_mean: f64,
}

impl Default for MapWeights {
    fn default() -> Self {
        Self {
            colley: 0.10,
            massey: 0.10,
            elo: 0.15,
            elo_mov: 0.15,
            trueskill: 0.10,
            pagerank: 0.10,
            bradley_terry: 0.10,
            sos: 0.10,
            consistency: 0.05,
            signal_mean: 0.05,
        }
    }
}

impl MapWeights {
    pub fn total(&self) -> f64 {
        self.colley
            + self.massey
            + self.elo
            + self.elo_mov
            + self.trueskill
            + self.pagerank
            + self.bradley_terry
            + self.sos
            + self.consistency
            + self.signal_mean
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapRatingConfig {
    pub elo_k: f64,
    pub elo_initial: f64,
    pub damping: f64,
    pub power_iterations: usize,
    pub fixed_point_passes: usize,
    /// Value every sub-metric falls back to when the map has too little data
    pub neutral: f64,
    pub weights: MapWeights,
}

impl Default for MapRatingConfig {
    fn default() -> Self {
        Self {
            elo_k: 32.0,
            elo_initial: 1500.0,
            damping: 0.85,
            power_iterations: 100,
            fixed_point_passes: 100,
            neutral: 0.5,
            weights: MapWeights::default(),
        }
    }
}

impl MapRatingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.elo_k <= 0.0 {
            return Err(RankingError::ConfigurationError {
                message: "map.elo_k must be positive".to_string(),
            }
            .into());
        }
        if !(0.0..1.0).contains(&self.damping) {
            return Err(RankingError::ConfigurationError {
                message: "map.damping must be in [0, 1)".to_string(),
            }
            .into());
        }
        if self.fixed_point_passes == 0 || self.power_iterations == 0 {
            return Err(RankingError::ConfigurationError {
                message: "map iteration counts must be greater than 0".to_string(),
            }
            .into());
        }
        if (self.weights.total() - 1.0).abs() > 1e-9 {
            return Err(RankingError::ConfigurationError {
                message: format!("map weights must sum to 1 (got {})", self.weights.total()),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((MapWeights::default().total() - 1.0).abs() < 1e-12);
        assert!(MapRatingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unbalanced_weights_rejected() {
        let mut config = MapRatingConfig::default();
        config.weights.elo = 0.5;
        assert!(config.validate().is_err());
    }
}
