//! Position and score deltas between two snapshots

use crate::history::snapshot::{RankingHistoryRow, RankingSnapshot};
use crate::types::TeamId;
use crate::utils::round2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Movement of one team present in the target snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDelta {
    pub team_id: TeamId,
    pub position: u32,
    pub score: f64,
    pub previous_position: Option<u32>,
    pub previous_score: Option<f64>,
    /// `previous − current`; positive means the team climbed
    pub position_delta: Option<i64>,
    /// `current − previous`, two decimals; positive means the team improved
    pub score_delta: Option<f64>,
    /// Absent from the base snapshot
    pub is_new: bool,
}

/// Team present only in the base snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedTeam {
    pub team_id: TeamId,
    pub previous_position: u32,
    pub previous_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaStats {
    pub compared: usize,
    pub new_teams: usize,
    pub dropped_teams: usize,
    pub max_position_delta: Option<i64>,
    pub min_position_delta: Option<i64>,
    pub mean_position_delta: Option<f64>,
    pub max_score_delta: Option<f64>,
    pub min_score_delta: Option<f64>,
    pub mean_score_delta: Option<f64>,
}

/// Full comparison of `from` (base) against `to` (target)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotComparison {
    pub from: RankingSnapshot,
    pub to: RankingSnapshot,
    /// Target snapshot order
    pub deltas: Vec<TeamDelta>,
    pub dropped: Vec<DroppedTeam>,
    pub stats: DeltaStats,
}

/// Match rows by team id. Target rows drive the delta list; base-only teams
/// are reported as dropped.
pub fn compute_deltas(
    base: &[RankingHistoryRow],
    target: &[RankingHistoryRow],
) -> (Vec<TeamDelta>, Vec<DroppedTeam>) {
    let previous: HashMap<TeamId, &RankingHistoryRow> =
        base.iter().map(|row| (row.team_id, row)).collect();
    let current: HashMap<TeamId, &RankingHistoryRow> =
        target.iter().map(|row| (row.team_id, row)).collect();

    let mut deltas: Vec<TeamDelta> = target
        .iter()
        .map(|row| match previous.get(&row.team_id) {
            Some(old) => TeamDelta {
                team_id: row.team_id,
                position: row.position,
                score: row.score,
                previous_position: Some(old.position),
                previous_score: Some(old.score),
                position_delta: Some(i64::from(old.position) - i64::from(row.position)),
                score_delta: Some(round2(row.score - old.score)),
                is_new: false,
            },
            None => TeamDelta {
                team_id: row.team_id,
                position: row.position,
                score: row.score,
                previous_position: None,
                previous_score: None,
                position_delta: None,
                score_delta: None,
                is_new: true,
            },
        })
        .collect();
    deltas.sort_by_key(|d| (d.position, d.team_id));

    let mut dropped: Vec<DroppedTeam> = base
        .iter()
        .filter(|row| !current.contains_key(&row.team_id))
        .map(|row| DroppedTeam {
            team_id: row.team_id,
            previous_position: row.position,
            previous_score: row.score,
        })
        .collect();
    dropped.sort_by_key(|d| (d.previous_position, d.team_id));

    (deltas, dropped)
}

pub fn delta_stats(deltas: &[TeamDelta], dropped: &[DroppedTeam]) -> DeltaStats {
    let positions: Vec<i64> = deltas.iter().filter_map(|d| d.position_delta).collect();
    let scores: Vec<f64> = deltas.iter().filter_map(|d| d.score_delta).collect();

    let mean_of = |values: &[f64]| {
        if values.is_empty() {
            None
        } else {
            Some(round2(values.iter().sum::<f64>() / values.len() as f64))
        }
    };
    let position_values: Vec<f64> = positions.iter().map(|&p| p as f64).collect();

    DeltaStats {
        compared: positions.len(),
        new_teams: deltas.iter().filter(|d| d.is_new).count(),
        dropped_teams: dropped.len(),
        max_position_delta: positions.iter().copied().max(),
        min_position_delta: positions.iter().copied().min(),
        mean_position_delta: mean_of(&position_values),
        max_score_delta: scores.iter().copied().reduce(f64::max),
        min_score_delta: scores.iter().copied().reduce(f64::min),
        mean_score_delta: mean_of(&scores),
    }
}

/// Compare two snapshots given their rows
pub fn compare_snapshots(
    from: RankingSnapshot,
    from_rows: &[RankingHistoryRow],
    to: RankingSnapshot,
    to_rows: &[RankingHistoryRow],
) -> SnapshotComparison {
    let (deltas, dropped) = compute_deltas(from_rows, to_rows);
    let stats = delta_stats(&deltas, &dropped);
    SnapshotComparison {
        from,
        to,
        deltas,
        dropped,
        stats,
    }
}
