//! Ranking engine configuration
//!
//! Every constant the pipeline uses lives here so that several configurations
//! can run side by side. The defaults reproduce the production ranking.

use crate::error::{RankingError, Result};
use serde::{Deserialize, Serialize};

/// Time-decay settings for the canonicalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// A match's weight halves every `half_life_days` relative to the newest match
    pub half_life_days: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            half_life_days: 110.0,
        }
    }
}

/// Elo replay and Bayesian shrinkage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    /// Base K-factor (`K0`)
    pub base_k: f64,
    /// Rating gap at which the dynamic K reaches half of `K0`
    pub c_factor: f64,
    pub seed_mean: f64,
    /// Seed spread applied to the standardized Colley score
    pub seed_std: f64,
    pub prior_mean: f64,
    pub prior_std: f64,
    /// Shrinkage weight on the mean is `1 / (1 + games / mean_shrink_games)`
    pub mean_shrink_games: f64,
    /// Posterior variance is `prior_variance / (1 + games / variance_shrink_games)`
    pub variance_shrink_games: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            base_k: 31.0,
            c_factor: 250.0,
            seed_mean: 1500.0,
            seed_std: 200.0,
            prior_mean: 1500.0,
            prior_std: 185.0,
            mean_shrink_games: 10.0,
            variance_shrink_games: 5.0,
        }
    }
}

/// TrueSkill-style model settings (draw probability is always zero)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    pub initial_rating: f64,
    pub initial_uncertainty: f64,
    pub beta: f64,
    pub default_dynamics: f64,
    /// Final score is `mean - conservative_sigmas * deviation`
    pub conservative_sigmas: f64,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            initial_rating: 25.0,
            initial_uncertainty: 25.0 / 3.0,
            beta: 25.0 / 6.0,
            default_dynamics: 25.0 / 300.0,
            conservative_sigmas: 3.0,
        }
    }
}

/// Graph centrality settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    pub damping: f64,
    /// Edge weight is `(1 + margin_alpha * margin_adjustment) * time_weight`
    pub margin_alpha: f64,
    pub max_iterations: usize,
    /// Per-node tolerance; the convergence threshold is `n * tolerance`
    pub tolerance: f64,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            margin_alpha: 1.0,
            max_iterations: 100,
            tolerance: 1.0e-6,
        }
    }
}

/// Pairwise-intensity optimizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairwiseConfig {
    /// Iteration cap per free parameter
    pub iterations_per_parameter: usize,
    pub gradient_tolerance: f64,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self {
            iterations_per_parameter: 200,
            gradient_tolerance: 1.0e-5,
        }
    }
}

/// Consistency metric settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    pub max_window: usize,
    /// Teams with fewer matches are maximally consistent
    pub min_matches: usize,
    pub differential_weight: f64,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            max_window: 5,
            min_matches: 5,
            differential_weight: 0.01,
        }
    }
}

/// Weights of the integrated rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub base: f64,
    pub sos: f64,
    pub consistency: f64,
    pub pca: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            base: 0.55,
            sos: 0.17,
            consistency: 0.05,
            pca: 0.23,
        }
    }
}

/// Confidence band settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub base_std: f64,
    pub games_scale: f64,
    pub z: f64,
    pub consistency_offset: f64,
    pub consistency_slope: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base_std: 12.0,
            games_scale: 5.0,
            z: 1.96,
            consistency_offset: 1.5,
            consistency_slope: 0.5,
        }
    }
}

/// Optional outlier detection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub enabled: bool,
    pub contamination: f64,
    pub min_games: u32,
    pub trees: usize,
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            contamination: 0.05,
            min_games: 5,
            trees: 100,
            max_samples: 256,
            seed: 42,
        }
    }
}

/// Complete, immutable configuration of one ranking run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub decay: DecayConfig,
    pub elo: EloConfig,
    pub skill: SkillConfig,
    pub centrality: CentralityConfig,
    pub pairwise: PairwiseConfig,
    pub consistency: ConsistencyConfig,
    pub blend: BlendConfig,
    pub confidence: ConfidenceConfig,
    pub anomaly: AnomalyConfig,
}

impl EngineConfig {
    /// Default configuration with the anomaly pass switched on
    pub fn with_anomaly_detection() -> Self {
        Self {
            anomaly: AnomalyConfig {
                enabled: true,
                ..AnomalyConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("decay.half_life_days", self.decay.half_life_days),
            ("elo.base_k", self.elo.base_k),
            ("elo.c_factor", self.elo.c_factor),
            ("elo.prior_std", self.elo.prior_std),
            ("elo.mean_shrink_games", self.elo.mean_shrink_games),
            ("elo.variance_shrink_games", self.elo.variance_shrink_games),
            ("skill.initial_uncertainty", self.skill.initial_uncertainty),
            ("skill.beta", self.skill.beta),
            ("centrality.tolerance", self.centrality.tolerance),
            ("pairwise.gradient_tolerance", self.pairwise.gradient_tolerance),
            ("confidence.base_std", self.confidence.base_std),
            ("confidence.games_scale", self.confidence.games_scale),
            ("confidence.z", self.confidence.z),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(config_error(format!("{name} must be positive")));
            }
        }

        let non_negative = [
            ("confidence.consistency_offset", self.confidence.consistency_offset),
            ("confidence.consistency_slope", self.confidence.consistency_slope),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(config_error(format!("{name} must be non-negative")));
            }
        }

        if !(0.0..1.0).contains(&self.centrality.damping) {
            return Err(config_error("centrality.damping must be in [0, 1)"));
        }
        if self.centrality.max_iterations == 0 || self.pairwise.iterations_per_parameter == 0 {
            return Err(config_error("iteration limits must be greater than 0"));
        }
        if self.consistency.max_window == 0 {
            return Err(config_error("consistency.max_window must be greater than 0"));
        }
        if !(self.anomaly.contamination > 0.0 && self.anomaly.contamination <= 0.5) {
            return Err(config_error("anomaly.contamination must be in (0, 0.5]"));
        }
        if self.anomaly.trees == 0 || self.anomaly.max_samples < 2 {
            return Err(config_error(
                "anomaly.trees must be positive and anomaly.max_samples at least 2",
            ));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> anyhow::Error {
    RankingError::ConfigurationError {
        message: message.into(),
    }
    .into()
}
