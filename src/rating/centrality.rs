//! Weighted PageRank over the loser-to-winner graph

use crate::canonical::MatchTable;
use crate::config::CentralityConfig;
use crate::error::Result;
use crate::rating::{margin_adjustment, ModelOutput, Rater};
use crate::types::RatingModel;
use std::collections::HashMap;

/// Graph centrality rater.
///
/// Every match adds `(1 + α·adj)·time_weight` to the edge from loser to winner;
/// a draw splits that weight between both directions.
#[derive(Debug, Clone)]
pub struct CentralityRater {
    config: CentralityConfig,
}

impl CentralityRater {
    pub fn new(config: CentralityConfig) -> Self {
        Self { config }
    }

    /// Accumulated edge weights keyed by (from, to)
    fn edges(&self, table: &MatchTable) -> HashMap<(usize, usize), f64> {
        let mut edges = HashMap::new();
        for m in table.matches() {
            let weight = (1.0 + self.config.margin_alpha * margin_adjustment(m.margin, m.total_points))
                * m.time_weight;
            if m.win_i {
                *edges.entry((m.j, m.i)).or_insert(0.0) += weight;
            } else if m.win_j {
                *edges.entry((m.i, m.j)).or_insert(0.0) += weight;
            } else {
                *edges.entry((m.i, m.j)).or_insert(0.0) += weight / 2.0;
                *edges.entry((m.j, m.i)).or_insert(0.0) += weight / 2.0;
            }
        }
        edges
    }

    /// Power iteration; `None` when it does not converge
    fn pagerank(&self, n: usize, edges: &HashMap<(usize, usize), f64>) -> Option<Vec<f64>> {
        let mut out_weight = vec![0.0; n];
        for (&(from, _), &w) in edges {
            out_weight[from] += w;
        }
        let links: Vec<(usize, usize, f64)> = edges
            .iter()
            .filter(|(&(from, _), _)| out_weight[from] > 0.0)
            .map(|(&(from, to), &w)| (from, to, w / out_weight[from]))
            .collect();

        let damping = self.config.damping;
        let uniform = 1.0 / n as f64;
        let mut rank = vec![uniform; n];

        for _ in 0..self.config.max_iterations {
            let dangling: f64 = (0..n)
                .filter(|&node| out_weight[node] <= 0.0)
                .map(|node| rank[node])
                .sum();

            let mut next = vec![(1.0 - damping) * uniform + damping * dangling * uniform; n];
            for &(from, to, share) in &links {
                next[to] += damping * rank[from] * share;
            }

            let err: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
            rank = next;
            if err < n as f64 * self.config.tolerance {
                return Some(rank);
            }
        }

        None
    }
}

impl Rater for CentralityRater {
    fn model(&self) -> RatingModel {
        RatingModel::Centrality
    }

    fn neutral(&self, team_count: usize) -> f64 {
        1.0 / team_count.max(1) as f64
    }

    fn rate(&self, table: &MatchTable) -> Result<ModelOutput> {
        let n = table.team_count();
        let edges = self.edges(table);

        match self.pagerank(n, &edges) {
            Some(rank) => Ok(ModelOutput::computed(self.model(), rank)),
            None => Ok(ModelOutput::fallback(
                self.model(),
                vec![self.neutral(n); n],
                format!(
                    "power iteration did not converge in {} iterations",
                    self.config.max_iterations
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::types::Match;
    use chrono::{TimeZone, Utc};

    fn at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_scores_sum_to_one() {
        let table = MatchTable::build(
            &[
                Match::new("alpha", "beta", 13, 4, at()),
                Match::new("beta", "gamma", 13, 11, at()),
                Match::new("alpha", "gamma", 13, 9, at()),
            ],
            &DecayConfig::default(),
        )
        .unwrap();
        let output = CentralityRater::new(CentralityConfig::default())
            .rate(&table)
            .unwrap();

        assert!(!output.is_fallback());
        assert!((output.scores.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        // Unbeaten team collects the most mass
        assert!(output.scores[0] > output.scores[1]);
        assert!(output.scores[1] > output.scores[2]);
    }

    #[test]
    fn test_draw_is_symmetric() {
        let table =
            MatchTable::build(&[Match::new("alpha", "beta", 9, 9, at())], &DecayConfig::default())
                .unwrap();
        let output = CentralityRater::new(CentralityConfig::default())
            .rate(&table)
            .unwrap();
        assert!((output.scores[0] - output.scores[1]).abs() < 1e-9);
    }

    #[test]
    fn test_non_convergence_falls_back_to_uniform() {
        let table = MatchTable::build(
            &[
                Match::new("alpha", "beta", 13, 4, at()),
                Match::new("gamma", "delta", 13, 4, at()),
            ],
            &DecayConfig::default(),
        )
        .unwrap();
        let config = CentralityConfig {
            max_iterations: 1,
            tolerance: 1.0e-15,
            ..CentralityConfig::default()
        };
        let output = CentralityRater::new(config).rate(&table).unwrap();
        assert!(output.is_fallback());
        assert_eq!(output.scores, vec![0.25; 4]);
    }
}
