//! Elo replay with a dynamic K-factor and Bayesian shrinkage
//!
//! Ratings are seeded from the standardized Colley scores, matches are replayed
//! chronologically, and each final rating is pulled toward a global prior in
//! proportion to how few games the team played.

use crate::canonical::MatchTable;
use crate::config::EloConfig;
use crate::error::{RankingError, Result};
use crate::rating::{margin_adjustment, ColleyRater, ModelOutput, Rater};
use crate::types::RatingModel;
use crate::utils::standardize;
use skillratings::elo::{expected_score, EloRating};
use tracing::debug;

/// Elo rater; `with_margin` selects the margin-of-victory variant
#[derive(Debug, Clone)]
pub struct EloRater {
    config: EloConfig,
    with_margin: bool,
}

impl EloRater {
    pub fn new(config: EloConfig) -> Self {
        Self {
            config,
            with_margin: false,
        }
    }

    pub fn with_margin(config: EloConfig) -> Self {
        Self {
            config,
            with_margin: true,
        }
    }

    /// `K0·|Δ|/(C+|Δ|)`, and `K0` for identical ratings
    pub fn dynamic_k(&self, own: f64, other: f64) -> f64 {
        let diff = (own - other).abs();
        if diff == 0.0 {
            self.config.base_k
        } else {
            self.config.base_k * diff / (self.config.c_factor + diff)
        }
    }

    /// Posterior (mean, variance) of one team after `games` games
    pub fn shrink(&self, observed: f64, games: u32) -> (f64, f64) {
        let games = f64::from(games);
        let prior_weight = 1.0 / (1.0 + games / self.config.mean_shrink_games);
        let mean = prior_weight * self.config.prior_mean + (1.0 - prior_weight) * observed;
        let variance =
            self.config.prior_std.powi(2) / (1.0 + games / self.config.variance_shrink_games);
        (mean, variance)
    }

    /// Replay every match starting from ratings derived from `colley` scores
    pub fn rate_seeded(&self, table: &MatchTable, colley: &[f64]) -> Result<ModelOutput> {
        let n = table.team_count();
        if colley.len() != n {
            return Err(RankingError::InternalError {
                message: format!("Elo seed has {} entries for {} teams", colley.len(), n),
            }
            .into());
        }

        let mut ratings: Vec<f64> = standardize(colley)
            .into_iter()
            .map(|z| self.config.seed_mean + z * self.config.seed_std)
            .collect();

        for m in table.matches() {
            let (ri, rj) = (ratings[m.i], ratings[m.j]);
            let (ei, ej) = expected_score(&EloRating { rating: ri }, &EloRating { rating: rj });

            let mut multiplier = m.time_weight;
            if self.with_margin {
                multiplier *= margin_adjustment(m.margin, m.total_points);
            }

            let result_i = m.result_i();
            ratings[m.i] += self.dynamic_k(ri, rj) * multiplier * (result_i - ei);
            ratings[m.j] += self.dynamic_k(rj, ri) * multiplier * ((1.0 - result_i) - ej);
        }

        let games = table.games_played();
        let shrunk: Vec<f64> = ratings
            .iter()
            .zip(&games)
            .map(|(&rating, &g)| self.shrink(rating, g).0)
            .collect();

        debug!(
            "{} replay finished over {} matches",
            self.model(),
            table.match_count()
        );
        Ok(ModelOutput::computed(self.model(), shrunk))
    }
}

impl Rater for EloRater {
    fn model(&self) -> RatingModel {
        if self.with_margin {
            RatingModel::EloMargin
        } else {
            RatingModel::Elo
        }
    }

    fn neutral(&self, _team_count: usize) -> f64 {
        self.config.prior_mean
    }

    fn rate(&self, table: &MatchTable) -> Result<ModelOutput> {
        let colley = ColleyRater::new().rate(table)?;
        self.rate_seeded(table, &colley.scores)
    }
}
