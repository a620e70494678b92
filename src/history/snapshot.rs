//! Snapshot and history records

use crate::types::{ComponentScores, RatingModel, SnapshotId, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format version written into every snapshot's metadata
pub const SNAPSHOT_FORMAT_VERSION: &str = "2.0";

/// Free-form description of the run that produced a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub calculation_date: DateTime<Utc>,
    pub algorithms_used: Vec<String>,
    pub version: String,
}

impl SnapshotMetadata {
    pub fn for_run(calculation_date: DateTime<Utc>) -> Self {
        let mut algorithms_used: Vec<String> = RatingModel::ALL
            .iter()
            .map(|m| m.as_str().to_string())
            .collect();
        algorithms_used.push("pca".to_string());
        Self {
            calculation_date,
            algorithms_used,
            version: SNAPSHOT_FORMAT_VERSION.to_string(),
        }
    }
}

/// One immutable aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub total_teams: usize,
    pub total_matches: usize,
    pub metadata: SnapshotMetadata,
}

/// One (snapshot, team) row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingHistoryRow {
    pub snapshot_id: SnapshotId,
    pub team_id: TeamId,
    pub position: u32,
    pub score: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub uncertainty: f64,
    pub games_count: u32,
    pub scores: ComponentScores,
}

/// History row before its snapshot id is known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryRow {
    pub team_id: TeamId,
    pub position: u32,
    pub score: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub uncertainty: f64,
    pub games_count: u32,
    pub scores: ComponentScores,
}

impl NewHistoryRow {
    pub fn into_row(self, snapshot_id: SnapshotId) -> RankingHistoryRow {
        RankingHistoryRow {
            snapshot_id,
            team_id: self.team_id,
            position: self.position,
            score: self.score,
            ci_lower: self.ci_lower,
            ci_upper: self.ci_upper,
            uncertainty: self.uncertainty,
            games_count: self.games_count,
            scores: self.scores,
        }
    }
}

/// Everything needed to insert a snapshot atomically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSnapshot {
    pub created_at: DateTime<Utc>,
    pub total_matches: usize,
    pub metadata: SnapshotMetadata,
    pub rows: Vec<NewHistoryRow>,
}

/// A snapshot together with its rows, ordered by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotExport {
    pub snapshot: RankingSnapshot,
    pub rows: Vec<RankingHistoryRow>,
}
