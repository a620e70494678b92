//! The ranking engine: canonicalize, rate, aggregate
//!
//! A pure batch computation from (teams, matches) to an ordered ranking table.
//! Nothing here touches storage; persisting a table is the history manager's
//! job.

use crate::aggregate::anomaly::isolation_forest;
use crate::aggregate::confidence::confidence_band;
use crate::aggregate::normalize::{borda_scores, rescale_to_percent, transpose, z_scores};
use crate::aggregate::pca::first_component_scores;
use crate::canonical::{CanonicalizeReport, MatchTable};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::metrics::{consistency_scores, strength_of_schedule};
use crate::rating::{ModelStatus, RatingSuite};
use crate::types::{AnomalyFlag, ComponentScores, Match, RankedTeam, RatingModel, Team};
use crate::utils::{cmp_f64, current_timestamp, mean, population_std, round2};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Status of one model in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub model: RatingModel,
    pub status: ModelStatus,
}

/// How a run went, beyond its scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub canonical: CanonicalizeReport,
    pub models: Vec<ModelReport>,
    /// Whether the outlier pass actually ran (enabled and enough teams)
    pub anomaly_pass_ran: bool,
    pub anomalies: usize,
}

/// General statistics of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub teams: usize,
    pub matches: usize,
    pub mean_games: f64,
    pub score_std: f64,
}

/// Output of one engine run, ordered by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingTable {
    pub computed_at: DateTime<Utc>,
    pub rows: Vec<RankedTeam>,
    /// Valid matches after canonicalization
    pub total_matches: usize,
    pub summary: RunSummary,
    pub diagnostics: RunDiagnostics,
}

impl RankingTable {
    pub fn row(&self, slug: &str) -> Option<&RankedTeam> {
        self.rows.iter().find(|row| row.slug == slug)
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.slug.as_str()).collect()
    }
}

/// Full ranking pipeline with one immutable configuration
#[derive(Debug, Clone)]
pub struct RankingEngine {
    config: EngineConfig,
    suite: RatingSuite,
}

impl RankingEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let suite = RatingSuite::new(&config);
        Ok(Self { config, suite })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rank every team with at least one valid match
    pub fn compute(&self, teams: &[Team], matches: &[Match]) -> Result<RankingTable> {
        info!(
            "Computing ranking from {} teams and {} matches",
            teams.len(),
            matches.len()
        );

        let table = MatchTable::build(matches, &self.config.decay)?;
        let n = table.team_count();
        let games = table.games_played();

        let suite = self.suite.run(&table)?;
        let outputs = suite.outputs();

        info!("Computing auxiliary metrics");
        let elo = suite.get(RatingModel::Elo)?;
        let sos = strength_of_schedule(&table, &elo.scores)?;
        let consistency = consistency_scores(&table, &self.config.consistency);

        info!("Aggregating {} model outputs", outputs.len());
        let z = z_scores(outputs);
        let z_rows = transpose(&z);
        let borda = borda_scores(outputs);
        let pca = first_component_scores(&z_rows);

        let (anomalies, anomaly_pass_ran) = self.detect_anomalies(&z_rows, &games);

        let blend = &self.config.blend;
        let integrated: Vec<f64> = (0..n)
            .map(|team| {
                blend.base * mean(&z_rows[team])
                    + blend.sos * sos[team]
                    + blend.consistency * consistency[team]
                    + blend.pca * pca[team]
            })
            .collect();
        let final_scores = rescale_to_percent(&integrated);

        let identities: HashMap<&str, &Team> =
            teams.iter().map(|team| (team.slug.as_str(), team)).collect();

        let mut rows: Vec<RankedTeam> = (0..n)
            .map(|team| {
                let slug = table.teams()[team].clone();
                let identity = identities.get(slug.as_str());
                let band = confidence_band(
                    final_scores[team],
                    games[team],
                    consistency[team],
                    &self.config.confidence,
                );
                let model = |m: RatingModel| {
                    outputs
                        .iter()
                        .find(|o| o.model == m)
                        .map(|o| o.scores[team])
                        .unwrap_or_default()
                };

                RankedTeam {
                    position: 0,
                    team_id: identity.map(|t| t.id),
                    name: identity.map(|t| t.name.clone()).unwrap_or_else(|| slug.clone()),
                    tag: identity.and_then(|t| t.tag.clone()),
                    organization: identity.and_then(|t| t.organization.clone()),
                    score: final_scores[team],
                    ci_lower: band.lower,
                    ci_upper: band.upper,
                    uncertainty: band.uncertainty,
                    games_count: games[team],
                    scores: ComponentScores {
                        colley: model(RatingModel::Colley),
                        massey: model(RatingModel::Massey),
                        elo: model(RatingModel::Elo),
                        elo_mov: model(RatingModel::EloMargin),
                        trueskill: model(RatingModel::Skill),
                        pagerank: model(RatingModel::Centrality),
                        bradley_terry: model(RatingModel::Pairwise),
                        pca: pca[team],
                        sos: sos[team],
                        consistency: consistency[team],
                        borda: borda[team],
                        integrated: integrated[team],
                    },
                    anomaly: anomalies.as_ref().map(|flags| flags[team]),
                    slug,
                }
            })
            .collect();

        // Deterministic order: score descending, then slug
        rows.sort_by(|a, b| cmp_f64(b.score, a.score).then_with(|| a.slug.cmp(&b.slug)));
        for (idx, row) in rows.iter_mut().enumerate() {
            row.position = idx as u32 + 1;
        }

        let summary = RunSummary {
            teams: n,
            matches: table.match_count(),
            mean_games: round2(mean(
                &games.iter().map(|&g| f64::from(g)).collect::<Vec<_>>(),
            )),
            score_std: round2(population_std(&final_scores)),
        };
        info!(
            "Ranking computed: {} teams, {} matches, {:.2} games per team, score std {:.2}",
            summary.teams, summary.matches, summary.mean_games, summary.score_std
        );

        let diagnostics = RunDiagnostics {
            canonical: table.report().clone(),
            models: outputs
                .iter()
                .map(|o| ModelReport {
                    model: o.model,
                    status: o.status.clone(),
                })
                .collect(),
            anomaly_pass_ran,
            anomalies: anomalies
                .as_ref()
                .map(|flags| flags.iter().filter(|f| f.is_anomaly).count())
                .unwrap_or(0),
        };

        Ok(RankingTable {
            computed_at: current_timestamp(),
            rows,
            total_matches: table.match_count(),
            summary,
            diagnostics,
        })
    }

    /// Per-team flags when the pass is enabled; `None` otherwise
    fn detect_anomalies(
        &self,
        z_rows: &[Vec<f64>],
        games: &[u32],
    ) -> (Option<Vec<AnomalyFlag>>, bool) {
        let config = &self.config.anomaly;
        if !config.enabled {
            return (None, false);
        }

        let mut flags = vec![
            AnomalyFlag {
                is_anomaly: false,
                score: 0.0,
            };
            z_rows.len()
        ];
        let eligible: Vec<usize> = (0..z_rows.len())
            .filter(|&team| games[team] >= config.min_games)
            .collect();
        if eligible.len() <= config.min_games as usize {
            debug!(
                "Skipping anomaly pass: {} teams with at least {} games",
                eligible.len(),
                config.min_games
            );
            return (Some(flags), false);
        }

        info!("Running anomaly pass over {} teams", eligible.len());
        let sample: Vec<Vec<f64>> = eligible.iter().map(|&team| z_rows[team].clone()).collect();
        for (&team, verdict) in eligible.iter().zip(isolation_forest(&sample, config)) {
            flags[team] = AnomalyFlag {
                is_anomaly: verdict.is_anomaly,
                score: verdict.score,
            };
        }
        (Some(flags), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn league() -> (Vec<Team>, Vec<Match>) {
        let teams = vec![
            Team::new(1, "alpha", "Alpha"),
            Team::new(2, "beta", "Beta"),
            Team::new(3, "gamma", "Gamma"),
            Team::new(4, "delta", "Delta"),
        ];
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 18, 0, 0).unwrap();
        let results = [
            ("alpha", "beta", 13, 8),
            ("alpha", "gamma", 13, 5),
            ("alpha", "delta", 13, 2),
            ("beta", "gamma", 13, 10),
            ("beta", "delta", 13, 7),
            ("gamma", "delta", 13, 11),
            ("beta", "alpha", 9, 13),
        ];
        let matches = results
            .iter()
            .enumerate()
            .map(|(k, &(i, j, si, sj))| Match::new(i, j, si, sj, start + Duration::days(k as i64)))
            .collect();
        (teams, matches)
    }

    #[test]
    fn test_compute_orders_league() {
        let (teams, matches) = league();
        let engine = RankingEngine::new(EngineConfig::default()).unwrap();
        let table = engine.compute(&teams, &matches).unwrap();

        assert_eq!(table.slugs(), vec!["alpha", "beta", "gamma", "delta"]);
        let positions: Vec<u32> = table.rows.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert_eq!(table.rows[0].score, 100.0);
        assert_eq!(table.rows[3].score, 0.0);
        assert_eq!(table.total_matches, 7);
        assert_eq!(table.summary.teams, 4);
        assert_eq!(table.rows[0].team_id, Some(1));
        assert!(table.rows.iter().all(|r| r.anomaly.is_none()));
        assert!(!table.diagnostics.anomaly_pass_ran);
    }

    #[test]
    fn test_bands_contain_scores() {
        let (teams, matches) = league();
        let table = RankingEngine::new(EngineConfig::default())
            .unwrap()
            .compute(&teams, &matches)
            .unwrap();
        for row in &table.rows {
            assert!(row.ci_lower <= row.score && row.score <= row.ci_upper);
            assert!((0.0..=100.0).contains(&row.score));
        }
    }

    #[test]
    fn test_unknown_slug_still_ranked() {
        let (teams, mut matches) = league();
        let at = Utc.with_ymd_and_hms(2024, 2, 10, 18, 0, 0).unwrap();
        matches.push(Match::new("walk-in", "delta", 13, 3, at));

        let table = RankingEngine::new(EngineConfig::default())
            .unwrap()
            .compute(&teams, &matches)
            .unwrap();
        let row = table.row("walk-in").unwrap();
        assert_eq!(row.team_id, None);
        assert_eq!(row.name, "walk-in");
        assert_eq!(table.rows.len(), 5);
    }

    #[test]
    fn test_anomaly_pass_skipped_for_small_league() {
        let (teams, matches) = league();
        let table = RankingEngine::new(EngineConfig::with_anomaly_detection())
            .unwrap()
            .compute(&teams, &matches)
            .unwrap();
        assert!(!table.diagnostics.anomaly_pass_ran);
        assert!(table
            .rows
            .iter()
            .all(|r| r.anomaly == Some(AnomalyFlag { is_anomaly: false, score: 0.0 })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.blend.base = f64::NAN;
        config.decay.half_life_days = -1.0;
        assert!(RankingEngine::new(config).is_err());
    }
}
