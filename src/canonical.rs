//! Match canonicalization
//!
//! Turns raw match records into the immutable table every rating model reads:
//! invalid rows dropped, duplicates removed, teams resolved to dense indices,
//! and each match weighted by its age relative to the newest match.

use crate::config::DecayConfig;
use crate::error::{RankingError, Result};
use crate::types::Match;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One deduplicated match with both teams resolved to table indices
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMatch {
    pub i: usize,
    pub j: usize,
    pub score_i: u32,
    pub score_j: u32,
    pub win_i: bool,
    pub win_j: bool,
    pub margin: u32,
    pub total_points: u32,
    pub played_at: DateTime<Utc>,
    pub map: Option<String>,
    /// `0.5 ^ (age_days / half_life)`, in (0, 1]
    pub time_weight: f64,
}

impl CanonicalMatch {
    pub fn involves(&self, team: usize) -> bool {
        self.i == team || self.j == team
    }

    pub fn is_draw(&self) -> bool {
        !self.win_i && !self.win_j
    }

    /// Actual result for side `i` (1 win, 0.5 draw, 0 loss)
    pub fn result_i(&self) -> f64 {
        if self.win_i {
            1.0
        } else if self.win_j {
            0.0
        } else {
            0.5
        }
    }

    /// The match seen from `team`: (opponent, own score, opponent score, won)
    pub fn perspective(&self, team: usize) -> Option<(usize, u32, u32, bool)> {
        if team == self.i {
            Some((self.j, self.score_i, self.score_j, self.win_i))
        } else if team == self.j {
            Some((self.i, self.score_j, self.score_i, self.win_j))
        } else {
            None
        }
    }
}

/// Counts of raw records dropped during canonicalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalizeReport {
    pub raw_matches: usize,
    pub missing_team: usize,
    pub missing_score: usize,
    pub same_team: usize,
    pub duplicates: usize,
    pub valid_matches: usize,
}

/// The canonical match table of one run
#[derive(Debug, Clone)]
pub struct MatchTable {
    teams: Vec<String>,
    index: HashMap<String, usize>,
    matches: Vec<CanonicalMatch>,
    latest: DateTime<Utc>,
    report: CanonicalizeReport,
}

struct PendingMatch {
    team_i: String,
    team_j: String,
    score_i: u32,
    score_j: u32,
    played_at: DateTime<Utc>,
    map: Option<String>,
}

fn normalized_slug(slug: &Option<String>) -> Option<String> {
    slug.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Unordered team pair + match minute + map
fn dedup_key(m: &PendingMatch) -> (String, String, String, Option<String>) {
    let (a, b) = if m.team_i <= m.team_j {
        (m.team_i.clone(), m.team_j.clone())
    } else {
        (m.team_j.clone(), m.team_i.clone())
    };
    (
        a,
        b,
        m.played_at.format("%Y-%m-%d %H:%M").to_string(),
        m.map.clone(),
    )
}

impl MatchTable {
    /// Build the table; fails with [`RankingError::EmptyInput`] when no valid match remains
    pub fn build(raw: &[Match], decay: &DecayConfig) -> Result<Self> {
        let mut report = CanonicalizeReport {
            raw_matches: raw.len(),
            ..CanonicalizeReport::default()
        };
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for m in raw {
            let (Some(team_i), Some(team_j)) = (normalized_slug(&m.team_i), normalized_slug(&m.team_j))
            else {
                report.missing_team += 1;
                continue;
            };
            let (Some(score_i), Some(score_j)) = (m.score_i, m.score_j) else {
                report.missing_score += 1;
                continue;
            };
            if team_i == team_j {
                report.same_team += 1;
                continue;
            }

            let candidate = PendingMatch {
                team_i,
                team_j,
                score_i,
                score_j,
                played_at: m.played_at,
                map: m.map.clone(),
            };
            if !seen.insert(dedup_key(&candidate)) {
                report.duplicates += 1;
                continue;
            }
            pending.push(candidate);
        }

        if pending.is_empty() {
            return Err(RankingError::EmptyInput.into());
        }

        // Stable: equal timestamps keep input order
        pending.sort_by_key(|m| m.played_at);

        let mut teams: Vec<String> = pending
            .iter()
            .flat_map(|m| [m.team_i.clone(), m.team_j.clone()])
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        teams.sort();
        let index: HashMap<String, usize> = teams
            .iter()
            .enumerate()
            .map(|(idx, slug)| (slug.clone(), idx))
            .collect();

        let latest = pending
            .iter()
            .map(|m| m.played_at)
            .max()
            .ok_or(RankingError::EmptyInput)?;

        let matches: Vec<CanonicalMatch> = pending
            .into_iter()
            .map(|m| {
                let age_days = (latest - m.played_at).num_seconds() as f64 / SECONDS_PER_DAY;
                CanonicalMatch {
                    i: index[&m.team_i],
                    j: index[&m.team_j],
                    score_i: m.score_i,
                    score_j: m.score_j,
                    win_i: m.score_i > m.score_j,
                    win_j: m.score_j > m.score_i,
                    margin: m.score_i.abs_diff(m.score_j),
                    total_points: m.score_i.saturating_add(m.score_j),
                    played_at: m.played_at,
                    map: m.map,
                    time_weight: 0.5_f64.powf(age_days / decay.half_life_days),
                }
            })
            .collect();

        report.valid_matches = matches.len();
        debug!(?report, "Canonicalized match history");
        info!(
            "Canonical match table: {} teams, {} matches ({} duplicates dropped)",
            teams.len(),
            matches.len(),
            report.duplicates
        );

        Ok(Self {
            teams,
            index,
            matches,
            latest,
            report,
        })
    }

    /// Team slugs, sorted; position = team index
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn index_of(&self, slug: &str) -> Option<usize> {
        self.index.get(slug).copied()
    }

    /// Matches in chronological order
    pub fn matches(&self) -> &[CanonicalMatch] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn latest_match(&self) -> DateTime<Utc> {
        self.latest
    }

    pub fn report(&self) -> &CanonicalizeReport {
        &self.report
    }

    /// Chronological matches of one team
    pub fn matches_for(&self, team: usize) -> impl Iterator<Item = &CanonicalMatch> {
        self.matches.iter().filter(move |m| m.involves(team))
    }

    /// Unweighted number of matches per team
    pub fn games_played(&self) -> Vec<u32> {
        let mut games = vec![0u32; self.teams.len()];
        for m in &self.matches {
            games[m.i] += 1;
            games[m.j] += 1;
        }
        games
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_drops_invalid_matches() {
        let mut missing_team = Match::new("alpha", "beta", 13, 5, at(1, 10, 0));
        missing_team.team_j = Some("  ".to_string());
        let mut missing_score = Match::new("alpha", "beta", 13, 5, at(1, 11, 0));
        missing_score.score_i = None;
        let raw = vec![
            Match::new("alpha", "alpha", 13, 5, at(1, 9, 0)),
            missing_team,
            missing_score,
            Match::new("alpha", "beta", 13, 5, at(1, 12, 0)),
        ];

        let table = MatchTable::build(&raw, &DecayConfig::default()).unwrap();
        assert_eq!(table.match_count(), 1);
        assert_eq!(table.report().same_team, 1);
        assert_eq!(table.report().missing_team, 1);
        assert_eq!(table.report().missing_score, 1);
        assert_eq!(table.teams(), &["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_deduplicates_mirrored_records() {
        let raw = vec![
            Match::new("alpha", "beta", 13, 5, at(1, 10, 0)).on_map("ascent"),
            // Same match recorded from the other team's side, seconds later
            Match::new("beta", "alpha", 5, 13, at(1, 10, 0) + Duration::seconds(30))
                .on_map("ascent"),
            // Same pair and minute but another map is a different match
            Match::new("alpha", "beta", 9, 13, at(1, 10, 0)).on_map("bind"),
        ];

        let table = MatchTable::build(&raw, &DecayConfig::default()).unwrap();
        assert_eq!(table.match_count(), 2);
        assert_eq!(table.report().duplicates, 1);

        // First occurrence wins
        let first = &table.matches()[0];
        assert_eq!(first.score_i, 13);
        assert!(first.win_i);
    }

    #[test]
    fn test_time_weight_halves_per_half_life() {
        let newest = at(20, 12, 0);
        let raw = vec![
            Match::new("alpha", "beta", 13, 5, newest - Duration::days(110)),
            Match::new("alpha", "gamma", 13, 5, newest - Duration::days(220)),
            Match::new("beta", "gamma", 13, 5, newest),
        ];

        let table = MatchTable::build(&raw, &DecayConfig::default()).unwrap();
        let weights: Vec<f64> = table.matches().iter().map(|m| m.time_weight).collect();

        // Chronological order: oldest first
        assert!((weights[0] - 0.25).abs() < 1e-12);
        assert!((weights[1] - 0.5).abs() < 1e-12);
        assert_eq!(weights[2], 1.0);
        assert_eq!(table.latest_match(), newest);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let raw = vec![Match::new("alpha", "alpha", 1, 0, at(1, 1, 0))];
        let err = MatchTable::build(&raw, &DecayConfig::default()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RankingError>(),
            Some(&RankingError::EmptyInput)
        );
        assert!(MatchTable::build(&[], &DecayConfig::default()).is_err());
    }

    #[test]
    fn test_draw_and_perspective() {
        let raw = vec![Match::new("alpha", "beta", 12, 12, at(2, 10, 0))];
        let table = MatchTable::build(&raw, &DecayConfig::default()).unwrap();
        let m = &table.matches()[0];

        assert!(m.is_draw());
        assert_eq!(m.result_i(), 0.5);
        assert_eq!(m.margin, 0);
        assert_eq!(m.total_points, 24);
        assert_eq!(m.perspective(1), Some((0, 12, 12, false)));
        assert_eq!(m.perspective(7), None);
        assert_eq!(table.games_played(), vec![1, 1]);
    }

    #[test]
    fn test_extreme_scores_saturate_total_points() {
        let raw = vec![Match::new("alpha", "beta", u32::MAX, 5, at(3, 10, 0))];
        let table = MatchTable::build(&raw, &DecayConfig::default()).unwrap();
        let m = &table.matches()[0];

        assert_eq!(m.total_points, u32::MAX);
        assert_eq!(m.margin, u32::MAX - 5);
        assert!(m.win_i);
    }
}
