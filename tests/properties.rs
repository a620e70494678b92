//! Property tests for the ranking invariants

mod fixtures;

use chrono::Duration;
use fixtures::{base_time, memory_history, teams};
use proptest::prelude::*;
use ranking_engine::aggregate::confidence::score_deviation;
use ranking_engine::config::{ConfidenceConfig, EngineConfig};
use ranking_engine::history::compute_deltas;
use ranking_engine::history::RankingHistoryRow;
use ranking_engine::types::{ComponentScores, Match};
use ranking_engine::RankingEngine;

const SLUGS: [&str; 6] = ["ash", "birch", "cedar", "dune", "elm", "fern"];

/// Random decisive or drawn results between the six fixture teams
fn arb_matches() -> impl Strategy<Value = Vec<Match>> {
    prop::collection::vec((0usize..6, 1usize..6, 0u32..=13, 0u32..=13), 1..40).prop_map(
        |results| {
            results
                .into_iter()
                .enumerate()
                .map(|(k, (a, offset, sa, sb))| {
                    let b = (a + offset) % SLUGS.len();
                    Match::new(
                        SLUGS[a],
                        SLUGS[b],
                        sa,
                        sb,
                        base_time() + Duration::hours(k as i64 * 5),
                    )
                })
                .collect()
        },
    )
}

fn history_row(team_id: i64, position: u32, score: f64) -> RankingHistoryRow {
    RankingHistoryRow {
        snapshot_id: 1,
        team_id,
        position,
        score,
        ci_lower: 0.0,
        ci_upper: 100.0,
        uncertainty: 1.0,
        games_count: 1,
        scores: ComponentScores::default(),
    }
}

/// Rows for a subset of team ids, positioned in the given order
fn arb_rows() -> impl Strategy<Value = Vec<RankingHistoryRow>> {
    (
        Just((1i64..=10).collect::<Vec<_>>()).prop_shuffle(),
        1usize..=10,
        prop::collection::vec(0u32..=10_000, 10),
    )
        .prop_map(|(ids, count, scores)| {
            ids.into_iter()
                .take(count)
                .enumerate()
                .map(|(idx, id)| history_row(id, idx as u32 + 1, f64::from(scores[idx]) / 100.0))
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_positions_contiguous_and_scores_bounded(matches in arb_matches()) {
        let engine = RankingEngine::new(EngineConfig::default()).unwrap();
        let table = engine.compute(&teams(&SLUGS), &matches).unwrap();

        let mut positions: Vec<u32> = table.rows.iter().map(|r| r.position).collect();
        positions.sort_unstable();
        prop_assert_eq!(positions, (1..=table.rows.len() as u32).collect::<Vec<_>>());

        for row in &table.rows {
            prop_assert!((0.0..=100.0).contains(&row.score));
            prop_assert!(row.ci_lower <= row.score && row.score <= row.ci_upper);
        }

        let history = memory_history();
        let snapshot = history.persist(&table).unwrap();
        let stored = history.history(snapshot.id).unwrap();
        let stored_positions: Vec<u32> = stored.iter().map(|r| r.position).collect();
        prop_assert_eq!(stored_positions, (1..=stored.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn prop_uncertainty_non_increasing_in_games(
        games in 0u32..500,
        extra in 1u32..500,
        consistency in 0.0f64..=1.0,
    ) {
        let config = ConfidenceConfig::default();
        let fewer = score_deviation(games, consistency, &config);
        let more = score_deviation(games + extra, consistency, &config);
        prop_assert!(more <= fewer);
    }

    #[test]
    fn prop_deltas_antisymmetric(base in arb_rows(), target in arb_rows()) {
        let (forward, forward_dropped) = compute_deltas(&base, &target);
        let (backward, backward_dropped) = compute_deltas(&target, &base);

        for delta in forward.iter().filter(|d| !d.is_new) {
            let reverse = backward.iter().find(|d| d.team_id == delta.team_id).unwrap();
            prop_assert_eq!(delta.position_delta.map(|p| -p), reverse.position_delta);
            prop_assert_eq!(delta.score_delta.map(|s| -s), reverse.score_delta);
        }

        // New on one side is dropped on the other, never both
        for delta in forward.iter().filter(|d| d.is_new) {
            prop_assert!(forward_dropped.iter().all(|d| d.team_id != delta.team_id));
            prop_assert!(backward_dropped.iter().any(|d| d.team_id == delta.team_id));
        }
        for dropped in &forward_dropped {
            prop_assert!(forward.iter().all(|d| d.team_id != dropped.team_id));
        }
    }
}
