//! Massey least-squares rating

use crate::canonical::MatchTable;
use crate::error::Result;
use crate::rating::{margin_adjustment, ModelOutput, Rater};
use crate::types::RatingModel;
use nalgebra::{DMatrix, DVector};

const SVD_EPSILON: f64 = 1.0e-12;

/// Massey's method on margin-adjusted, time-weighted differentials.
///
/// The raw system only fixes ratings up to a constant; the last equation is
/// replaced by `Σ r = 0`.
#[derive(Debug, Clone, Default)]
pub struct MasseyRater;

impl MasseyRater {
    pub fn new() -> Self {
        Self
    }

    fn system(table: &MatchTable) -> (DMatrix<f64>, DVector<f64>) {
        let n = table.team_count();
        let mut m = DMatrix::<f64>::zeros(n, n);
        let mut y = DVector::<f64>::zeros(n);

        for game in table.matches() {
            let (i, j, w) = (game.i, game.j, game.time_weight);
            m[(i, i)] += w;
            m[(j, j)] += w;
            m[(i, j)] -= w;
            m[(j, i)] -= w;

            let adj = margin_adjustment(game.margin, game.total_points);
            let signed = if game.win_i { adj } else { -adj };
            y[i] += signed * w;
            y[j] -= signed * w;
        }

        let last = n - 1;
        for col in 0..n {
            m[(last, col)] = 1.0;
        }
        y[last] = 0.0;

        (m, y)
    }
}

impl Rater for MasseyRater {
    fn model(&self) -> RatingModel {
        RatingModel::Massey
    }

    fn neutral(&self, _team_count: usize) -> f64 {
        0.0
    }

    fn rate(&self, table: &MatchTable) -> Result<ModelOutput> {
        let n = table.team_count();
        let (m, y) = Self::system(table);

        match m.svd(true, true).solve(&y, SVD_EPSILON) {
            Ok(r) => Ok(ModelOutput::computed(self.model(), r.iter().copied().collect())),
            Err(reason) => Ok(ModelOutput::fallback(self.model(), vec![0.0; n], reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::types::Match;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_winner_rated_above_loser() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let table = MatchTable::build(
            &[
                Match::new("alpha", "beta", 13, 2, at),
                Match::new("beta", "gamma", 13, 4, at),
            ],
            &DecayConfig::default(),
        )
        .unwrap();
        let output = MasseyRater::new().rate(&table).unwrap();

        assert!(!output.is_fallback());
        assert!(output.scores[0] > output.scores[1]);
        assert!(output.scores[1] > output.scores[2]);
        assert!(output.scores.iter().sum::<f64>().abs() < 1e-9);
    }

    #[test]
    fn test_draw_gives_equal_ratings() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let table =
            MatchTable::build(&[Match::new("alpha", "beta", 8, 8, at)], &DecayConfig::default())
                .unwrap();
        let output = MasseyRater::new().rate(&table).unwrap();
        assert!(output.scores.iter().all(|s| s.abs() < 1e-9));
    }
}
