//! TrueSkill-style rating with time-weighted updates

use crate::canonical::MatchTable;
use crate::config::SkillConfig;
use crate::error::Result;
use crate::rating::{ModelOutput, Rater};
use crate::types::RatingModel;
use skillratings::trueskill::{trueskill, TrueSkillConfig, TrueSkillRating};
use skillratings::Outcomes;

/// Skill rater. Each update is blended with the pre-match state by the match's
/// time weight; the score is the conservative `mean - k·deviation`.
#[derive(Debug, Clone)]
pub struct SkillRater {
    config: SkillConfig,
}

impl SkillRater {
    pub fn new(config: SkillConfig) -> Self {
        Self { config }
    }

    fn initial_rating(&self) -> TrueSkillRating {
        TrueSkillRating {
            rating: self.config.initial_rating,
            uncertainty: self.config.initial_uncertainty,
        }
    }

    fn trueskill_config(&self) -> TrueSkillConfig {
        TrueSkillConfig {
            draw_probability: 0.0,
            beta: self.config.beta,
            default_dynamics: self.config.default_dynamics,
        }
    }

    fn blend(old: &TrueSkillRating, new: &TrueSkillRating, weight: f64) -> TrueSkillRating {
        TrueSkillRating {
            rating: old.rating * (1.0 - weight) + new.rating * weight,
            uncertainty: old.uncertainty * (1.0 - weight) + new.uncertainty * weight,
        }
    }

    /// Final (mean, deviation) of every team
    pub fn replay(&self, table: &MatchTable) -> Vec<TrueSkillRating> {
        let config = self.trueskill_config();
        let mut ratings = vec![self.initial_rating(); table.team_count()];

        for m in table.matches() {
            // Draws carry no information at zero draw probability
            let (winner, loser) = if m.win_i {
                (m.i, m.j)
            } else if m.win_j {
                (m.j, m.i)
            } else {
                continue;
            };

            let (old_winner, old_loser) = (ratings[winner], ratings[loser]);
            let (new_winner, new_loser) =
                trueskill(&old_winner, &old_loser, &Outcomes::WIN, &config);

            ratings[winner] = Self::blend(&old_winner, &new_winner, m.time_weight);
            ratings[loser] = Self::blend(&old_loser, &new_loser, m.time_weight);
        }

        ratings
    }
}

impl Rater for SkillRater {
    fn model(&self) -> RatingModel {
        RatingModel::Skill
    }

    fn neutral(&self, _team_count: usize) -> f64 {
        self.config.initial_rating - self.config.conservative_sigmas * self.config.initial_uncertainty
    }

    fn rate(&self, table: &MatchTable) -> Result<ModelOutput> {
        let scores = self
            .replay(table)
            .iter()
            .map(|r| r.rating - self.config.conservative_sigmas * r.uncertainty)
            .collect();
        Ok(ModelOutput::computed(self.model(), scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::types::Match;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_untouched_team_scores_zero() {
        let rater = SkillRater::new(SkillConfig::default());
        // 25 - 3 * 25/3
        assert!(rater.neutral(2).abs() < 1e-12);
    }

    #[test]
    fn test_win_moves_ratings_apart() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let table =
            MatchTable::build(&[Match::new("alpha", "beta", 13, 9, at)], &DecayConfig::default())
                .unwrap();
        let ratings = SkillRater::new(SkillConfig::default()).replay(&table);

        assert!(ratings[0].rating > 25.0);
        assert!(ratings[1].rating < 25.0);
        assert!(ratings[0].uncertainty < 25.0 / 3.0);
    }

    #[test]
    fn test_old_matches_move_less() {
        let latest = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let fresh = MatchTable::build(
            &[
                Match::new("alpha", "beta", 13, 9, latest),
                Match::new("gamma", "delta", 13, 9, latest),
            ],
            &DecayConfig::default(),
        )
        .unwrap();
        let stale = MatchTable::build(
            &[
                Match::new("alpha", "beta", 13, 9, latest - Duration::days(330)),
                Match::new("gamma", "delta", 13, 9, latest),
            ],
            &DecayConfig::default(),
        )
        .unwrap();

        let rater = SkillRater::new(SkillConfig::default());
        let fresh_alpha = rater.replay(&fresh)[fresh.index_of("alpha").unwrap()];
        let stale_alpha = rater.replay(&stale)[stale.index_of("alpha").unwrap()];
        assert!(fresh_alpha.rating > stale_alpha.rating);
        assert!(stale_alpha.rating > 25.0);
    }

    #[test]
    fn test_draw_is_skipped() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let table =
            MatchTable::build(&[Match::new("alpha", "beta", 7, 7, at)], &DecayConfig::default())
                .unwrap();
        let output = SkillRater::new(SkillConfig::default()).rate(&table).unwrap();
        assert!(output.scores.iter().all(|s| s.abs() < 1e-12));
    }
}
