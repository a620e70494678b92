//! Snapshot/History Manager
//!
//! Persists ranking tables as snapshots and answers every history query:
//! comparisons, evolution windows, per-team history, variations, pruning and
//! export.

use crate::aggregate::RankingTable;
use crate::error::{RankingError, Result};
use crate::history::delta::{compare_snapshots, SnapshotComparison};
use crate::history::evolution::{summarize, EvolutionSummary};
use crate::history::snapshot::{
    NewHistoryRow, NewSnapshot, RankingHistoryRow, RankingSnapshot, SnapshotExport,
    SnapshotMetadata,
};
use crate::history::storage::SnapshotStore;
use crate::types::{RankedTeam, SnapshotId, TeamId};
use crate::utils::round2;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// A stored row annotated against the preceding snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    #[serde(flatten)]
    pub row: RankingHistoryRow,
    pub variation: Option<i64>,
    pub score_variation: Option<f64>,
    pub is_new: bool,
}

/// A freshly computed row annotated against the latest stored snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEntry {
    #[serde(flatten)]
    pub row: RankedTeam,
    pub variation: Option<i64>,
    pub score_variation: Option<f64>,
    pub is_new: bool,
}

/// One point of a team's trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamHistoryPoint {
    pub snapshot_id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub position: u32,
    pub score: f64,
    pub games_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneReport {
    pub kept: usize,
    pub deleted: Vec<SnapshotId>,
    pub failed: Vec<SnapshotId>,
}

fn variation(
    previous: Option<&HashMap<TeamId, (u32, f64)>>,
    team_id: Option<TeamId>,
    position: u32,
    score: f64,
) -> (Option<i64>, Option<f64>, bool) {
    let Some(previous) = previous else {
        return (None, None, false);
    };
    match team_id.and_then(|id| previous.get(&id)) {
        Some(&(old_position, old_score)) => (
            Some(i64::from(old_position) - i64::from(position)),
            Some(round2(score - old_score)),
            false,
        ),
        None => (None, None, true),
    }
}

fn position_index(rows: &[RankingHistoryRow]) -> HashMap<TeamId, (u32, f64)> {
    rows.iter()
        .map(|row| (row.team_id, (row.position, row.score)))
        .collect()
}

/// History manager over any [`SnapshotStore`]
#[derive(Clone)]
pub struct HistoryManager {
    store: Arc<dyn SnapshotStore>,
    min_retained: usize,
}

impl std::fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("min_retained", &self.min_retained)
            .finish_non_exhaustive()
    }
}

impl HistoryManager {
    pub fn new(store: Arc<dyn SnapshotStore>, min_retained: usize) -> Self {
        Self {
            store,
            min_retained: min_retained.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Persist a ranking table as a new snapshot.
    ///
    /// Rows without a stored team id are skipped with a warning; persisted
    /// positions are renumbered 1..N among the remaining rows.
    pub fn persist(&self, table: &RankingTable) -> Result<RankingSnapshot> {
        let mut rows = Vec::with_capacity(table.rows.len());
        for ranked in &table.rows {
            let Some(team_id) = ranked.team_id else {
                warn!(
                    "Team '{}' has no stored identity; skipping it in the snapshot",
                    ranked.slug
                );
                continue;
            };
            rows.push(NewHistoryRow {
                team_id,
                position: rows.len() as u32 + 1,
                score: ranked.score,
                ci_lower: ranked.ci_lower,
                ci_upper: ranked.ci_upper,
                uncertainty: ranked.uncertainty,
                games_count: ranked.games_count,
                scores: ranked.scores.clone(),
            });
        }

        if rows.is_empty() {
            return Err(RankingError::NoResolvableTeams.into());
        }

        let snapshot = self.store.insert_snapshot(NewSnapshot {
            created_at: table.computed_at,
            total_matches: table.total_matches,
            metadata: SnapshotMetadata::for_run(table.computed_at),
            rows,
        })?;
        info!(
            "Snapshot #{} saved with {} teams ({} ranked)",
            snapshot.id,
            snapshot.total_teams,
            table.rows.len()
        );
        Ok(snapshot)
    }

    pub fn snapshot(&self, id: SnapshotId) -> Result<RankingSnapshot> {
        self.store
            .get_snapshot(id)?
            .ok_or_else(|| RankingError::SnapshotNotFound { id }.into())
    }

    pub fn latest(&self) -> Result<Option<RankingSnapshot>> {
        self.store.latest_snapshot()
    }

    pub fn list(&self, limit: usize) -> Result<Vec<RankingSnapshot>> {
        self.store.list_snapshots(limit)
    }

    /// Rows of an existing snapshot ordered by position
    pub fn history(&self, id: SnapshotId) -> Result<Vec<RankingHistoryRow>> {
        self.snapshot(id)?;
        self.store.history(id)
    }

    /// Delete a snapshot; refuses to remove the last one
    pub fn delete(&self, id: SnapshotId) -> Result<()> {
        if !self.store.delete_snapshot(id)? {
            return Err(RankingError::SnapshotNotFound { id }.into());
        }
        info!("Snapshot #{} deleted", id);
        Ok(())
    }

    /// Deltas of `to` relative to `from`
    pub fn compare(&self, from: SnapshotId, to: SnapshotId) -> Result<SnapshotComparison> {
        let from_snapshot = self.snapshot(from)?;
        let to_snapshot = self.snapshot(to)?;
        let from_rows = self.store.history(from)?;
        let to_rows = self.store.history(to)?;
        Ok(compare_snapshots(
            from_snapshot,
            &from_rows,
            to_snapshot,
            &to_rows,
        ))
    }

    /// Deltas of `id` relative to its immediate predecessor, if any
    pub fn compare_with_previous(&self, id: SnapshotId) -> Result<Option<SnapshotComparison>> {
        self.snapshot(id)?;
        match self.store.previous_snapshot(id)? {
            Some(previous) => self.compare(previous.id, id).map(Some),
            None => Ok(None),
        }
    }

    /// Compare the oldest and newest snapshot of the trailing `days` window
    pub fn evolution(&self, days: u32, now: DateTime<Utc>) -> Result<EvolutionSummary> {
        let since = now - Duration::days(i64::from(days));
        let window = self.store.snapshots_since(since)?;

        let (Some(oldest), Some(newest)) = (window.first(), window.last()) else {
            return Ok(EvolutionSummary::Insufficient {
                days,
                snapshots_in_window: 0,
            });
        };
        if window.len() < 2 {
            return Ok(EvolutionSummary::Insufficient {
                days,
                snapshots_in_window: window.len(),
            });
        }

        let comparison = self.compare(oldest.id, newest.id)?;
        Ok(EvolutionSummary::Report(Box::new(summarize(days, comparison))))
    }

    /// A team's position and score over the most recent snapshots, newest first
    pub fn team_history(&self, team_id: TeamId, limit: usize) -> Result<Vec<TeamHistoryPoint>> {
        Ok(self
            .store
            .team_history(team_id, limit)?
            .into_iter()
            .map(|(snapshot, row)| TeamHistoryPoint {
                snapshot_id: snapshot.id,
                created_at: snapshot.created_at,
                position: row.position,
                score: row.score,
                games_count: row.games_count,
            })
            .collect())
    }

    /// Stored ranking of `id` with variations against its predecessor
    pub fn ranking_with_variations(&self, id: SnapshotId) -> Result<Vec<RankingEntry>> {
        let rows = self.history(id)?;
        let previous = match self.store.previous_snapshot(id)? {
            Some(snapshot) => Some(position_index(&self.store.history(snapshot.id)?)),
            None => None,
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                let (variation, score_variation, is_new) =
                    variation(previous.as_ref(), Some(row.team_id), row.position, row.score);
                RankingEntry {
                    row,
                    variation,
                    score_variation,
                    is_new,
                }
            })
            .collect())
    }

    /// A live (unsaved) table annotated against the latest snapshot
    pub fn live_variations(&self, table: &RankingTable) -> Result<Vec<LiveEntry>> {
        let previous = match self.store.latest_snapshot()? {
            Some(snapshot) => Some(position_index(&self.store.history(snapshot.id)?)),
            None => None,
        };

        Ok(table
            .rows
            .iter()
            .map(|row| {
                let (variation, score_variation, is_new) =
                    variation(previous.as_ref(), row.team_id, row.position, row.score);
                LiveEntry {
                    row: row.clone(),
                    variation,
                    score_variation,
                    is_new,
                }
            })
            .collect())
    }

    /// Keep the `keep` most recent snapshots and delete the rest
    pub fn prune(&self, keep: usize) -> Result<PruneReport> {
        if keep < self.min_retained {
            return Err(RankingError::InvalidRequest {
                reason: format!(
                    "must keep at least {} snapshots (asked for {})",
                    self.min_retained, keep
                ),
            }
            .into());
        }

        let total = self.store.snapshot_count()?;
        let snapshots = self.store.list_snapshots(total)?;
        let mut report = PruneReport {
            kept: snapshots.len().min(keep),
            ..PruneReport::default()
        };

        for snapshot in snapshots.iter().skip(keep) {
            match self.store.delete_snapshot(snapshot.id) {
                Ok(true) => report.deleted.push(snapshot.id),
                Ok(false) => {}
                Err(err) => {
                    warn!("Failed to prune snapshot #{}: {:#}", snapshot.id, err);
                    report.failed.push(snapshot.id);
                }
            }
        }

        info!(
            "Pruned {} snapshots ({} failed), {} kept",
            report.deleted.len(),
            report.failed.len(),
            report.kept
        );
        Ok(report)
    }

    /// Snapshot plus rows, for serialization
    pub fn export(&self, id: SnapshotId) -> Result<SnapshotExport> {
        Ok(SnapshotExport {
            snapshot: self.snapshot(id)?,
            rows: self.store.history(id)?,
        })
    }

    /// Write [`HistoryManager::export`] as pretty JSON
    pub fn export_to_file(&self, id: SnapshotId, path: &Path) -> Result<SnapshotExport> {
        let export = self.export(id)?;
        let json = serde_json::to_string_pretty(&export).context("Failed to serialize snapshot")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot export to {}", path.display()))?;
        info!("Snapshot #{} exported to {}", id, path.display());
        Ok(export)
    }
}
