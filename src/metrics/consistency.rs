//! Consistency of a team's results over time

use crate::canonical::MatchTable;
use crate::config::ConsistencyConfig;
use crate::utils::population_std;

/// Consistency of one team: `1 / (1 + std(window performances))`.
///
/// Windows slide over the team's chronological matches; a window's
/// performance is its win rate plus a small share of its summed score
/// differential. Teams with too few matches score 1.0.
pub fn team_consistency(table: &MatchTable, team: usize, config: &ConsistencyConfig) -> f64 {
    // (won, own score - opponent score)
    let results: Vec<(bool, f64)> = table
        .matches_for(team)
        .filter_map(|m| m.perspective(team))
        .map(|(_, own, other, won)| (won, f64::from(own) - f64::from(other)))
        .collect();

    if results.len() < config.min_matches {
        return 1.0;
    }

    let window = config.max_window.min(results.len() / 2).max(1);
    let performances: Vec<f64> = results
        .windows(window)
        .map(|slice| {
            let wins = slice.iter().filter(|(won, _)| *won).count() as f64;
            let differential: f64 = slice.iter().map(|(_, diff)| diff).sum();
            wins / window as f64 + config.differential_weight * differential
        })
        .collect();

    if performances.len() > 1 {
        1.0 / (1.0 + population_std(&performances))
    } else {
        1.0
    }
}

/// Consistency of every team in table order
pub fn consistency_scores(table: &MatchTable, config: &ConsistencyConfig) -> Vec<f64> {
    (0..table.team_count())
        .map(|team| team_consistency(table, team, config))
        .collect()
}
