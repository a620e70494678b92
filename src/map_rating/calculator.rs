//! Map-restricted rating calculator
//!
//! A lighter rendition of the full pipeline for one team on one map: small
//! closed-form or fixed-iteration variants of every model, no time decay, and
//! a fixed-weight blend of the nine signals.

use crate::config::MapRatingConfig;
use crate::error::{RankingError, Result};
use crate::types::Match;
use crate::utils::{mean, population_std, round2};
use chrono::{DateTime, Utc};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

const NORMALIZE_EPSILON: f64 = 1.0e-6;
const SVD_EPSILON: f64 = 1.0e-12;
const POWER_TOLERANCE: f64 = 1.0e-12;

/// Rating of one team on one map. Sub-metrics are in `[0, 1]` except the
/// centrality share; `final_rating` is on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRating {
    pub team: String,
    pub map: String,
    pub matches_played: usize,
    pub colley: f64,
    pub massey: f64,
    pub elo: f64,
    pub elo_mov: f64,
    pub trueskill: f64,
    pub pagerank: f64,
    pub bradley_terry: f64,
    pub sos: f64,
    pub consistency: f64,
    /// Mean of the nine signals above
    pub signal_mean: f64,
    pub final_rating: f64,
}

#[derive(Debug, Clone)]
struct MapMatch {
    i: usize,
    j: usize,
    score_i: u32,
    score_j: u32,
    played_at: DateTime<Utc>,
}

impl MapMatch {
    /// Actual score of side i: 1 win, 0 loss, 0.5 draw
    fn result_i(&self) -> f64 {
        match self.score_i.cmp(&self.score_j) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => 0.0,
            std::cmp::Ordering::Equal => 0.5,
        }
    }

    /// `(own, other)` scores from `team`'s side, if it played
    fn side(&self, team: usize) -> Option<(u32, u32)> {
        if self.i == team {
            Some((self.score_i, self.score_j))
        } else if self.j == team {
            Some((self.score_j, self.score_i))
        } else {
            None
        }
    }

    fn opponent(&self, team: usize) -> Option<usize> {
        if self.i == team {
            Some(self.j)
        } else if self.j == team {
            Some(self.i)
        } else {
            None
        }
    }
}

/// Matches of one map with teams resolved to indices (alphabetical by slug)
#[derive(Debug)]
struct MapTable {
    teams: Vec<String>,
    games: Vec<MapMatch>,
}

impl MapTable {
    fn build(matches: &[Match], map: &str) -> Self {
        let on_map: Vec<(&str, &str, u32, u32, DateTime<Utc>)> = matches
            .iter()
            .filter(|m| m.map.as_deref() == Some(map))
            .filter_map(|m| {
                let i = m.team_i.as_deref()?;
                let j = m.team_j.as_deref()?;
                if i == j {
                    return None;
                }
                Some((i, j, m.score_i?, m.score_j?, m.played_at))
            })
            .collect();

        let teams: Vec<String> = on_map
            .iter()
            .flat_map(|&(i, j, ..)| [i, j])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let index = |slug: &str| teams.binary_search_by(|t| t.as_str().cmp(slug)).ok();

        let mut games: Vec<MapMatch> = on_map
            .iter()
            .filter_map(|&(i, j, score_i, score_j, played_at)| {
                Some(MapMatch {
                    i: index(i)?,
                    j: index(j)?,
                    score_i,
                    score_j,
                    played_at,
                })
            })
            .collect();
        games.sort_by_key(|g| g.played_at);

        Self { teams, games }
    }

    fn index_of(&self, slug: &str) -> Option<usize> {
        self.teams.binary_search_by(|t| t.as_str().cmp(slug)).ok()
    }

    fn n(&self) -> usize {
        self.teams.len()
    }
}

/// Min-max position of `values[team]`, `max - min` padded to avoid division by zero
fn normalized(values: &[f64], team: usize) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (values[team] - min) / (max - min + NORMALIZE_EPSILON)
}

#[derive(Debug, Clone, Default)]
pub struct MapRatingCalculator {
    config: MapRatingConfig,
}

impl MapRatingCalculator {
    pub fn new(config: MapRatingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MapRatingConfig {
        &self.config
    }

    /// Rate `team` using every match played on `map`.
    ///
    /// Opponent-dependent metrics see the whole map, not just the team's own
    /// games. A team with no games on the map gets neutral signals.
    pub fn rate(&self, matches: &[Match], team: &str, map: &str) -> Result<MapRating> {
        if team.trim().is_empty() || map.trim().is_empty() {
            return Err(RankingError::InvalidRequest {
                reason: "team and map must not be empty".to_string(),
            }
            .into());
        }

        let table = MapTable::build(matches, map);
        let neutral = self.config.neutral;

        let (signals, played) = match table.index_of(team) {
            Some(idx) if table.n() >= 2 => {
                let played = table.games.iter().filter(|g| g.side(idx).is_some()).count();
                let (elo, elo_mov) = self.elo(&table, idx);
                (
                    [
                        colley(&table, idx, neutral),
                        massey(&table, idx, neutral),
                        elo,
                        elo_mov,
                        performance(&table, idx, neutral),
                        self.pagerank(&table, idx),
                        self.bradley_terry(&table, idx),
                        strength_of_schedule(&table, idx, neutral),
                        consistency(&table, idx, neutral),
                    ],
                    played,
                )
            }
            _ => {
                debug!(
                    "Team '{}' has no rateable games on map '{}'; using neutral signals",
                    team, map
                );
                ([neutral; 9], 0)
            }
        };

        let signal_mean = mean(&signals);
        let w = &self.config.weights;
        let weights = [
            w.colley,
            w.massey,
            w.elo,
            w.elo_mov,
            w.trueskill,
            w.pagerank,
            w.bradley_terry,
            w.sos,
            w.consistency,
        ];
        let blended: f64 = signals
            .iter()
            .zip(weights)
            .map(|(s, w)| s * w)
            .sum::<f64>()
            + w.signal_mean * signal_mean;
        let final_rating = round2(blended * 100.0);

        info!(
            "Map rating for '{}' on '{}': {:.2} from {} games ({} teams on map)",
            team,
            map,
            final_rating,
            played,
            table.n()
        );

        let [colley, massey, elo, elo_mov, trueskill, pagerank, bradley_terry, sos, consistency] =
            signals;
        Ok(MapRating {
            team: team.to_string(),
            map: map.to_string(),
            matches_played: played,
            colley,
            massey,
            elo,
            elo_mov,
            trueskill,
            pagerank,
            bradley_terry,
            sos,
            consistency,
            signal_mean,
            final_rating,
        })
    }

    /// Plain and margin-scaled Elo replayed chronologically, both normalized
    fn elo(&self, table: &MapTable, team: usize) -> (f64, f64) {
        let (elo, elo_mov) = self.replay_elo(table);
        (normalized(&elo, team), normalized(&elo_mov, team))
    }

    /// Raw plain and margin-scaled ratings. Both share the plain expected score.
    fn replay_elo(&self, table: &MapTable) -> (Vec<f64>, Vec<f64>) {
        let k = self.config.elo_k;
        let mut elo = vec![self.config.elo_initial; table.n()];
        let mut elo_mov = elo.clone();

        let expected = |ri: f64, rj: f64| 1.0 / (1.0 + 10f64.powf((rj - ri) / 400.0));

        for game in &table.games {
            let (i, j) = (game.i, game.j);
            let actual = game.result_i();

            let e = expected(elo[i], elo[j]);
            elo[i] += k * (actual - e);
            elo[j] -= k * (actual - e);

            // Multiplier uses the post-update plain Elo gap, denominator floored at 0.1
            let margin = f64::from(game.score_i.abs_diff(game.score_j));
            let multiplier = (margin + 1.0).ln() * 2.2 / ((elo[i] - elo[j]) * 0.001 + 2.2).max(0.1);
            elo_mov[i] += k * multiplier * (actual - e);
            elo_mov[j] -= k * multiplier * (actual - e);
        }

        (elo, elo_mov)
    }

    /// Dominant eigenvector of the damped, column-normalized win matrix
    fn pagerank(&self, table: &MapTable, team: usize) -> f64 {
        let n = table.n();
        let d = self.config.damping;

        // Column = loser, row = winner: each defeat passes rank to the winner
        let mut wins = DMatrix::<f64>::zeros(n, n);
        for game in &table.games {
            match game.score_i.cmp(&game.score_j) {
                std::cmp::Ordering::Greater => wins[(game.i, game.j)] += 1.0,
                std::cmp::Ordering::Less => wins[(game.j, game.i)] += 1.0,
                std::cmp::Ordering::Equal => {}
            }
        }
        for col in 0..n {
            let sum: f64 = wins.column(col).sum();
            if sum > 0.0 {
                wins.column_mut(col).unscale_mut(sum);
            }
        }
        let transition = wins * d + DMatrix::from_element(n, n, (1.0 - d) / n as f64);

        let uniform = 1.0 / n as f64;
        let mut rank = DVector::from_element(n, uniform);
        for _ in 0..self.config.power_iterations {
            let mut next = &transition * &rank;
            let total = next.iter().map(|v| v.abs()).sum::<f64>();
            if total <= 0.0 || !total.is_finite() {
                return uniform;
            }
            next.unscale_mut(total);
            let change = (&next - &rank).abs().sum();
            rank = next;
            if change < POWER_TOLERANCE {
                break;
            }
        }
        rank[team]
    }

    /// Bradley-Terry strengths by fixed-point passes, relative to the strongest
    fn bradley_terry(&self, table: &MapTable, team: usize) -> f64 {
        let n = table.n();
        let mut strength = vec![1.0; n];

        for _ in 0..self.config.fixed_point_passes {
            let mut scored = vec![0.0; n];
            let mut expected = vec![0.0; n];
            for game in &table.games {
                let (i, j) = (game.i, game.j);
                let pair = strength[i] + strength[j];
                let total = f64::from(game.score_i) + f64::from(game.score_j);
                scored[i] += f64::from(game.score_i);
                scored[j] += f64::from(game.score_j);
                expected[i] += total * strength[i] / pair;
                expected[j] += total * strength[j] / pair;
            }

            let mut next: Vec<f64> = scored
                .iter()
                .zip(&expected)
                .map(|(s, e)| if *e == 0.0 { *s } else { s / e })
                .collect();
            let sum: f64 = next.iter().sum();
            if sum <= 0.0 || !sum.is_finite() {
                return self.config.neutral;
            }
            next.iter_mut().for_each(|v| *v *= n as f64 / sum);
            strength = next;
        }

        let max = strength.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            strength[team] / max
        } else {
            self.config.neutral
        }
    }
}

/// `(1 + w - l) / (2 + w + l)` over the team's decisive games
fn colley(table: &MapTable, team: usize, neutral: f64) -> f64 {
    let (mut wins, mut losses) = (0.0, 0.0);
    for (own, other) in table.games.iter().filter_map(|g| g.side(team)) {
        if own > other {
            wins += 1.0;
        } else if own < other {
            losses += 1.0;
        }
    }
    if wins + losses == 0.0 {
        return neutral;
    }
    (1.0 + wins - losses) / (2.0 + wins + losses)
}

/// Massey on raw score differentials, pinned so ratings sum to zero
fn massey(table: &MapTable, team: usize, neutral: f64) -> f64 {
    let n = table.n();
    if n < 3 {
        return neutral;
    }
    let mut m = DMatrix::<f64>::zeros(n, n);
    let mut y = DVector::<f64>::zeros(n);

    for game in &table.games {
        let (i, j) = (game.i, game.j);
        m[(i, i)] += 1.0;
        m[(j, j)] += 1.0;
        m[(i, j)] -= 1.0;
        m[(j, i)] -= 1.0;
        let diff = f64::from(game.score_i) - f64::from(game.score_j);
        y[i] += diff;
        y[j] -= diff;
    }
    m.row_mut(n - 1).fill(1.0);
    y[n - 1] = 0.0;

    match m.svd(true, true).solve(&y, SVD_EPSILON) {
        Ok(r) => normalized(r.as_slice(), team),
        Err(reason) => {
            debug!("Map Massey solve failed: {}", reason);
            neutral
        }
    }
}

/// `mean - std / 2` of the share of points won, clamped to `[0, 1]`
fn performance(table: &MapTable, team: usize, neutral: f64) -> f64 {
    let ratios: Vec<f64> = table
        .games
        .iter()
        .filter_map(|g| g.side(team))
        .filter(|(own, other)| own.saturating_add(*other) > 0)
        .map(|(own, other)| f64::from(own) / (f64::from(own) + f64::from(other)))
        .collect();
    if ratios.is_empty() {
        return neutral;
    }
    (mean(&ratios) - population_std(&ratios) / 2.0).clamp(0.0, 1.0)
}

/// Mean win rate of the opponents faced, one entry per game
fn strength_of_schedule(table: &MapTable, team: usize, neutral: f64) -> f64 {
    let n = table.n();
    let mut wins = vec![0u32; n];
    let mut games = vec![0u32; n];
    for game in &table.games {
        games[game.i] += 1;
        games[game.j] += 1;
        match game.score_i.cmp(&game.score_j) {
            std::cmp::Ordering::Greater => wins[game.i] += 1,
            std::cmp::Ordering::Less => wins[game.j] += 1,
            std::cmp::Ordering::Equal => {}
        }
    }

    let rates: Vec<f64> = table
        .games
        .iter()
        .filter_map(|g| g.opponent(team))
        .map(|opp| {
            if games[opp] == 0 {
                neutral
            } else {
                f64::from(wins[opp]) / f64::from(games[opp])
            }
        })
        .collect();
    if rates.is_empty() {
        return neutral;
    }
    mean(&rates)
}

/// `1 / (1 + cv)` of the score differentials; a zero mean counts as `cv = 1`
fn consistency(table: &MapTable, team: usize, neutral: f64) -> f64 {
    let diffs: Vec<f64> = table
        .games
        .iter()
        .filter_map(|g| g.side(team))
        .map(|(own, other)| f64::from(own) - f64::from(other))
        .collect();
    if diffs.len() < 2 {
        return neutral;
    }
    let mu = mean(&diffs);
    let cv = if mu == 0.0 {
        1.0
    } else {
        population_std(&diffs) / mu.abs()
    };
    1.0 / (1.0 + cv)
}
