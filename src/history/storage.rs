//! Snapshot storage interface and in-memory implementation

use crate::error::{RankingError, Result};
use crate::history::snapshot::{NewSnapshot, RankingHistoryRow, RankingSnapshot};
use crate::types::{SnapshotId, TeamId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Durable home of snapshots and their history rows.
///
/// Implementations serialize snapshot creation: a snapshot and all of its
/// rows become visible together, and ids strictly increase.
pub trait SnapshotStore: Send + Sync {
    /// Insert a snapshot with its rows in one atomic step
    fn insert_snapshot(&self, snapshot: NewSnapshot) -> Result<RankingSnapshot>;

    fn get_snapshot(&self, id: SnapshotId) -> Result<Option<RankingSnapshot>>;

    /// Rows of one snapshot ordered by position
    fn history(&self, id: SnapshotId) -> Result<Vec<RankingHistoryRow>>;

    /// Most recent snapshots first
    fn list_snapshots(&self, limit: usize) -> Result<Vec<RankingSnapshot>>;

    /// Snapshot with the highest id below `id`
    fn previous_snapshot(&self, id: SnapshotId) -> Result<Option<RankingSnapshot>>;

    /// Snapshots created at or after `since`, oldest first
    fn snapshots_since(&self, since: DateTime<Utc>) -> Result<Vec<RankingSnapshot>>;

    fn snapshot_count(&self) -> Result<usize>;

    /// Delete a snapshot and its rows.
    ///
    /// Returns `false` when no such snapshot exists; refuses with
    /// [`RankingError::CannotDeleteLastSnapshot`] when it is the only one.
    fn delete_snapshot(&self, id: SnapshotId) -> Result<bool>;

    /// One team's rows across the most recent snapshots, newest first
    fn team_history(
        &self,
        team_id: TeamId,
        limit: usize,
    ) -> Result<Vec<(RankingSnapshot, RankingHistoryRow)>>;

    fn latest_snapshot(&self) -> Result<Option<RankingSnapshot>> {
        Ok(self.list_snapshots(1)?.into_iter().next())
    }
}

#[derive(Debug, Default)]
struct StoreState {
    snapshots: BTreeMap<SnapshotId, (RankingSnapshot, Vec<RankingHistoryRow>)>,
    last_id: SnapshotId,
}

/// In-memory snapshot store for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    state: RwLock<StoreState>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire snapshot store read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire snapshot store write lock".to_string(),
            }
            .into()
        })
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn insert_snapshot(&self, snapshot: NewSnapshot) -> Result<RankingSnapshot> {
        let mut state = self.write()?;
        let id = state.last_id + 1;

        let record = RankingSnapshot {
            id,
            created_at: snapshot.created_at,
            total_teams: snapshot.rows.len(),
            total_matches: snapshot.total_matches,
            metadata: snapshot.metadata,
        };
        let mut rows: Vec<RankingHistoryRow> =
            snapshot.rows.into_iter().map(|row| row.into_row(id)).collect();
        rows.sort_by_key(|row| row.position);

        state.last_id = id;
        state.snapshots.insert(id, (record.clone(), rows));
        Ok(record)
    }

    fn get_snapshot(&self, id: SnapshotId) -> Result<Option<RankingSnapshot>> {
        let state = self.read()?;
        Ok(state.snapshots.get(&id).map(|(snapshot, _)| snapshot.clone()))
    }

    fn history(&self, id: SnapshotId) -> Result<Vec<RankingHistoryRow>> {
        let state = self.read()?;
        Ok(state
            .snapshots
            .get(&id)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn list_snapshots(&self, limit: usize) -> Result<Vec<RankingSnapshot>> {
        let state = self.read()?;
        Ok(state
            .snapshots
            .values()
            .rev()
            .take(limit)
            .map(|(snapshot, _)| snapshot.clone())
            .collect())
    }

    fn previous_snapshot(&self, id: SnapshotId) -> Result<Option<RankingSnapshot>> {
        let state = self.read()?;
        Ok(state
            .snapshots
            .range(..id)
            .next_back()
            .map(|(_, (snapshot, _))| snapshot.clone()))
    }

    fn snapshots_since(&self, since: DateTime<Utc>) -> Result<Vec<RankingSnapshot>> {
        let state = self.read()?;
        let mut snapshots: Vec<RankingSnapshot> = state
            .snapshots
            .values()
            .filter(|(snapshot, _)| snapshot.created_at >= since)
            .map(|(snapshot, _)| snapshot.clone())
            .collect();
        snapshots.sort_by_key(|s| (s.created_at, s.id));
        Ok(snapshots)
    }

    fn snapshot_count(&self) -> Result<usize> {
        Ok(self.read()?.snapshots.len())
    }

    fn delete_snapshot(&self, id: SnapshotId) -> Result<bool> {
        let mut state = self.write()?;
        if !state.snapshots.contains_key(&id) {
            return Ok(false);
        }
        if state.snapshots.len() == 1 {
            return Err(RankingError::CannotDeleteLastSnapshot { id }.into());
        }
        state.snapshots.remove(&id);
        Ok(true)
    }

    fn team_history(
        &self,
        team_id: TeamId,
        limit: usize,
    ) -> Result<Vec<(RankingSnapshot, RankingHistoryRow)>> {
        let state = self.read()?;
        Ok(state
            .snapshots
            .values()
            .rev()
            .filter_map(|(snapshot, rows)| {
                rows.iter()
                    .find(|row| row.team_id == team_id)
                    .map(|row| (snapshot.clone(), row.clone()))
            })
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::snapshot::{NewHistoryRow, SnapshotMetadata};
    use crate::types::ComponentScores;
    use chrono::{Duration, TimeZone};

    fn new_snapshot(created_at: DateTime<Utc>, teams: &[(TeamId, u32, f64)]) -> NewSnapshot {
        NewSnapshot {
            created_at,
            total_matches: 10,
            metadata: SnapshotMetadata::for_run(created_at),
            rows: teams
                .iter()
                .map(|&(team_id, position, score)| NewHistoryRow {
                    team_id,
                    position,
                    score,
                    ci_lower: 0.0,
                    ci_upper: 100.0,
                    uncertainty: 10.0,
                    games_count: 4,
                    scores: ComponentScores::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = InMemorySnapshotStore::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let snapshot = store
            .insert_snapshot(new_snapshot(at, &[(7, 2, 40.0), (3, 1, 90.0)]))
            .unwrap();

        assert_eq!(snapshot.id, 1);
        assert_eq!(snapshot.total_teams, 2);
        let rows = store.history(1).unwrap();
        assert_eq!(rows[0].team_id, 3);
        assert_eq!(rows[1].snapshot_id, 1);
        assert_eq!(store.get_snapshot(1).unwrap(), Some(snapshot));
        assert!(store.get_snapshot(2).unwrap().is_none());
    }

    #[test]
    fn test_ids_never_reused() {
        let store = InMemorySnapshotStore::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        store.insert_snapshot(new_snapshot(at, &[(1, 1, 50.0)])).unwrap();
        store.insert_snapshot(new_snapshot(at, &[(1, 1, 50.0)])).unwrap();
        assert!(store.delete_snapshot(2).unwrap());
        let third = store.insert_snapshot(new_snapshot(at, &[(1, 1, 50.0)])).unwrap();
        assert_eq!(third.id, 3);
        assert_eq!(store.previous_snapshot(3).unwrap().map(|s| s.id), Some(1));
    }

    #[test]
    fn test_last_snapshot_protected() {
        let store = InMemorySnapshotStore::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        store.insert_snapshot(new_snapshot(at, &[(1, 1, 50.0)])).unwrap();

        let err = store.delete_snapshot(1).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RankingError>(),
            Some(&RankingError::CannotDeleteLastSnapshot { id: 1 })
        );
        assert_eq!(store.snapshot_count().unwrap(), 1);
        assert!(!store.delete_snapshot(99).unwrap());
    }

    #[test]
    fn test_listing_and_windows() {
        let store = InMemorySnapshotStore::new();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        for day in 0..4 {
            store
                .insert_snapshot(new_snapshot(
                    start + Duration::days(day * 10),
                    &[(1, 1, 50.0 + day as f64)],
                ))
                .unwrap();
        }

        let listed: Vec<SnapshotId> = store.list_snapshots(2).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(listed, vec![4, 3]);
        assert_eq!(store.latest_snapshot().unwrap().map(|s| s.id), Some(4));

        let recent: Vec<SnapshotId> = store
            .snapshots_since(start + Duration::days(15))
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(recent, vec![3, 4]);

        let history = store.team_history(1, 3).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].1.score, 53.0);
    }
}
