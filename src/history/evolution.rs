//! Evolution summary over a trailing window of snapshots

use crate::history::delta::{SnapshotComparison, TeamDelta};
use crate::utils::cmp_f64;
use serde::{Deserialize, Serialize};

/// Number of movers reported in each direction
pub const TOP_MOVERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionReport {
    pub days: u32,
    pub comparison: SnapshotComparison,
    pub top_climbers: Vec<TeamDelta>,
    pub top_fallers: Vec<TeamDelta>,
    pub top_score_gainers: Vec<TeamDelta>,
    pub top_score_losers: Vec<TeamDelta>,
}

/// Result of an evolution query; too few snapshots is not an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvolutionSummary {
    Insufficient { days: u32, snapshots_in_window: usize },
    Report(Box<EvolutionReport>),
}

impl EvolutionSummary {
    pub fn report(&self) -> Option<&EvolutionReport> {
        match self {
            EvolutionSummary::Report(report) => Some(report),
            EvolutionSummary::Insufficient { .. } => None,
        }
    }
}

fn top_by<F>(deltas: &[TeamDelta], key: F, descending: bool) -> Vec<TeamDelta>
where
    F: Fn(&TeamDelta) -> Option<f64>,
{
    let mut movers: Vec<(f64, &TeamDelta)> = deltas
        .iter()
        .filter_map(|d| key(d).map(|k| (k, d)))
        .filter(|(k, _)| if descending { *k > 0.0 } else { *k < 0.0 })
        .collect();
    movers.sort_by(|a, b| {
        let order = if descending {
            cmp_f64(b.0, a.0)
        } else {
            cmp_f64(a.0, b.0)
        };
        order.then_with(|| a.1.team_id.cmp(&b.1.team_id))
    });
    movers
        .into_iter()
        .take(TOP_MOVERS)
        .map(|(_, d)| d.clone())
        .collect()
}

/// Build the report from the comparison of the window's oldest and newest snapshot
pub fn summarize(days: u32, comparison: SnapshotComparison) -> EvolutionReport {
    let position = |d: &TeamDelta| d.position_delta.map(|p| p as f64);
    let score = |d: &TeamDelta| d.score_delta;

    EvolutionReport {
        days,
        top_climbers: top_by(&comparison.deltas, position, true),
        top_fallers: top_by(&comparison.deltas, position, false),
        top_score_gainers: top_by(&comparison.deltas, score, true),
        top_score_losers: top_by(&comparison.deltas, score, false),
        comparison,
    }
}
