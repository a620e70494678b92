//! Pairwise intensity: Bradley-Terry strengths under a Poisson score model
//!
//! Team i's score against team j is Poisson with rate `exp(β_i − β_j)`. The
//! strengths maximize the time-weighted likelihood of every observed score
//! with the first team pinned at zero.

use crate::canonical::MatchTable;
use crate::config::PairwiseConfig;
use crate::error::Result;
use crate::rating::optimize::{Bfgs, Termination};
use crate::rating::{ModelOutput, Rater};
use crate::types::RatingModel;
use nalgebra::DVector;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PairwiseRater {
    config: PairwiseConfig,
}

struct Observation {
    i: usize,
    j: usize,
    score_i: f64,
    score_j: f64,
    weight: f64,
}

/// Negative log-likelihood (without the constant `ln Γ(s+1)` terms) and its
/// gradient with respect to the free strengths `β_1..β_{n-1}`
fn negative_log_likelihood(observations: &[Observation], free: &DVector<f64>) -> (f64, DVector<f64>) {
    let strength = |team: usize| if team == 0 { 0.0 } else { free[team - 1] };
    let mut value = 0.0;
    let mut gradient = DVector::<f64>::zeros(free.len());

    for obs in observations {
        let d = strength(obs.i) - strength(obs.j);
        let (lambda_i, lambda_j) = (d.exp(), (-d).exp());
        value += obs.weight * ((lambda_i - obs.score_i * d) + (lambda_j + obs.score_j * d));

        let slope = obs.weight * (lambda_i - obs.score_i - lambda_j + obs.score_j);
        if obs.i > 0 {
            gradient[obs.i - 1] += slope;
        }
        if obs.j > 0 {
            gradient[obs.j - 1] -= slope;
        }
    }

    (value, gradient)
}

impl PairwiseRater {
    pub fn new(config: PairwiseConfig) -> Self {
        Self { config }
    }
}

impl Rater for PairwiseRater {
    fn model(&self) -> RatingModel {
        RatingModel::Pairwise
    }

    fn neutral(&self, _team_count: usize) -> f64 {
        0.0
    }

    fn rate(&self, table: &MatchTable) -> Result<ModelOutput> {
        let n = table.team_count();
        let free = n.saturating_sub(1);
        if free == 0 {
            return Ok(ModelOutput::computed(self.model(), vec![0.0; n]));
        }

        let observations: Vec<Observation> = table
            .matches()
            .iter()
            .map(|m| Observation {
                i: m.i,
                j: m.j,
                score_i: f64::from(m.score_i),
                score_j: f64::from(m.score_j),
                weight: m.time_weight,
            })
            .collect();

        let optimizer = Bfgs::new(
            self.config.iterations_per_parameter * free,
            self.config.gradient_tolerance,
        );
        let minimum = optimizer.minimize(
            |beta| negative_log_likelihood(&observations, beta),
            DVector::zeros(free),
        );
        debug!(
            "Pairwise optimizer stopped after {} iterations ({:?})",
            minimum.iterations, minimum.termination
        );

        let reason = match minimum.termination {
            Termination::Converged if minimum.x.iter().all(|b| b.is_finite()) => {
                let mut scores = Vec::with_capacity(n);
                scores.push(0.0);
                scores.extend(minimum.x.iter().copied());
                return Ok(ModelOutput::computed(self.model(), scores));
            }
            Termination::Converged => "non-finite strengths".to_string(),
            Termination::MaxIterations => {
                format!("optimizer did not converge in {} iterations", minimum.iterations)
            }
            Termination::LineSearchFailed => "line search failed".to_string(),
        };

        Ok(ModelOutput::fallback(self.model(), vec![0.0; n], reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::types::Match;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_two_team_closed_form() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let raw: Vec<Match> = (0..3)
            .map(|k| Match::new("alpha", "beta", 13, 0, at + Duration::hours(k)))
            .collect();
        let table = MatchTable::build(&raw, &DecayConfig::default()).unwrap();
        let output = PairwiseRater::new(PairwiseConfig::default())
            .rate(&table)
            .unwrap();

        // Optimum solves e^d - e^-d = 13 with d = β_alpha - β_beta
        assert!(!output.is_fallback());
        assert_eq!(output.scores[0], 0.0);
        let d = output.scores[0] - output.scores[1];
        assert!((d - 6.5_f64.asinh()).abs() < 1e-4);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let observations = vec![
            Observation { i: 0, j: 1, score_i: 13.0, score_j: 7.0, weight: 1.0 },
            Observation { i: 1, j: 2, score_i: 9.0, score_j: 13.0, weight: 0.5 },
        ];
        let point = DVector::from_vec(vec![0.3, -0.2]);
        let (_, gradient) = negative_log_likelihood(&observations, &point);

        let h = 1e-6;
        for k in 0..2 {
            let mut up = point.clone();
            up[k] += h;
            let mut down = point.clone();
            down[k] -= h;
            let numeric = (negative_log_likelihood(&observations, &up).0
                - negative_log_likelihood(&observations, &down).0)
                / (2.0 * h);
            assert!((numeric - gradient[k]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_stronger_team_higher() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let table = MatchTable::build(
            &[
                Match::new("alpha", "beta", 13, 5, at),
                Match::new("beta", "gamma", 13, 6, at),
                Match::new("alpha", "gamma", 13, 2, at),
            ],
            &DecayConfig::default(),
        )
        .unwrap();
        let output = PairwiseRater::new(PairwiseConfig::default())
            .rate(&table)
            .unwrap();
        assert!(output.scores[0] > output.scores[1]);
        assert!(output.scores[1] > output.scores[2]);
    }
}
