//! SQLite-backed snapshot store

use crate::error::{RankingError, Result};
use crate::history::snapshot::{NewSnapshot, RankingHistoryRow, RankingSnapshot, SnapshotMetadata};
use crate::history::storage::SnapshotStore;
use crate::types::{ComponentScores, SnapshotId, TeamId};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ranking_snapshots (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at    TEXT    NOT NULL,
    total_teams   INTEGER NOT NULL,
    total_matches INTEGER NOT NULL,
    metadata      TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS ranking_history (
    snapshot_id         INTEGER NOT NULL REFERENCES ranking_snapshots(id) ON DELETE CASCADE,
    team_id             INTEGER NOT NULL,
    position            INTEGER NOT NULL,
    score               REAL    NOT NULL,
    ci_lower            REAL    NOT NULL,
    ci_upper            REAL    NOT NULL,
    uncertainty         REAL    NOT NULL,
    games_count         INTEGER NOT NULL,
    score_colley        REAL    NOT NULL,
    score_massey        REAL    NOT NULL,
    score_elo           REAL    NOT NULL,
    score_elo_mov       REAL    NOT NULL,
    score_trueskill     REAL    NOT NULL,
    score_pagerank      REAL    NOT NULL,
    score_bradley_terry REAL    NOT NULL,
    score_pca           REAL    NOT NULL,
    score_sos           REAL    NOT NULL,
    score_consistency   REAL    NOT NULL,
    score_borda         INTEGER NOT NULL,
    score_integrated    REAL    NOT NULL,
    PRIMARY KEY (snapshot_id, team_id)
);

CREATE INDEX IF NOT EXISTS idx_ranking_history_team ON ranking_history(team_id, snapshot_id);
CREATE INDEX IF NOT EXISTS idx_ranking_snapshots_created ON ranking_snapshots(created_at);
";

const SNAPSHOT_COLUMNS: &str = "id, created_at, total_teams, total_matches, metadata";

const HISTORY_COLUMNS: &str = "snapshot_id, team_id, position, score, ci_lower, ci_upper, \
     uncertainty, games_count, score_colley, score_massey, score_elo, score_elo_mov, \
     score_trueskill, score_pagerank, score_bradley_terry, score_pca, score_sos, \
     score_consistency, score_borda, score_integrated";

fn db_err(err: rusqlite::Error) -> anyhow::Error {
    RankingError::from(err).into()
}

fn encode_time(at: &DateTime<Utc>) -> String {
    // Fixed width keeps text order equal to time order
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Raw snapshot columns; decoded outside the rusqlite closure
struct SnapshotRecord {
    id: SnapshotId,
    created_at: String,
    total_teams: i64,
    total_matches: i64,
    metadata: String,
}

impl SnapshotRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            total_teams: row.get(2)?,
            total_matches: row.get(3)?,
            metadata: row.get(4)?,
        })
    }

    fn decode(self) -> Result<RankingSnapshot> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("Invalid created_at on snapshot {}", self.id))?
            .with_timezone(&Utc);
        let metadata: SnapshotMetadata = serde_json::from_str(&self.metadata)
            .with_context(|| format!("Invalid metadata on snapshot {}", self.id))?;
        Ok(RankingSnapshot {
            id: self.id,
            created_at,
            total_teams: usize::try_from(self.total_teams)?,
            total_matches: usize::try_from(self.total_matches)?,
            metadata,
        })
    }
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<RankingHistoryRow> {
    Ok(RankingHistoryRow {
        snapshot_id: row.get(0)?,
        team_id: row.get(1)?,
        position: row.get(2)?,
        score: row.get(3)?,
        ci_lower: row.get(4)?,
        ci_upper: row.get(5)?,
        uncertainty: row.get(6)?,
        games_count: row.get(7)?,
        scores: ComponentScores {
            colley: row.get(8)?,
            massey: row.get(9)?,
            elo: row.get(10)?,
            elo_mov: row.get(11)?,
            trueskill: row.get(12)?,
            pagerank: row.get(13)?,
            bradley_terry: row.get(14)?,
            pca: row.get(15)?,
            sos: row.get(16)?,
            consistency: row.get(17)?,
            borda: row.get(18)?,
            integrated: row.get(19)?,
        },
    })
}

/// Snapshot store on a single SQLite connection
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSnapshotStore").finish_non_exhaustive()
    }
}

impl SqliteSnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open snapshot database at {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to apply snapshot schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire snapshot database lock".to_string(),
            }
            .into()
        })
    }

    fn query_snapshots(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RankingSnapshot>> {
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let records = stmt
            .query_map(params, SnapshotRecord::from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        records.into_iter().map(SnapshotRecord::decode).collect()
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn insert_snapshot(&self, snapshot: NewSnapshot) -> Result<RankingSnapshot> {
        let metadata = serde_json::to_string(&snapshot.metadata)
            .context("Failed to serialize snapshot metadata")?;
        let total_teams = snapshot.rows.len();
        let created_at = snapshot.created_at.trunc_subsecs(6);

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO ranking_snapshots (created_at, total_teams, total_matches, metadata)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                encode_time(&created_at),
                total_teams as i64,
                snapshot.total_matches as i64,
                metadata
            ],
        )
        .map_err(db_err)?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO ranking_history ({HISTORY_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?17, ?18, ?19, ?20)"
                ))
                .map_err(db_err)?;
            for row in &snapshot.rows {
                let s = &row.scores;
                stmt.execute(params![
                    id,
                    row.team_id,
                    row.position,
                    row.score,
                    row.ci_lower,
                    row.ci_upper,
                    row.uncertainty,
                    row.games_count,
                    s.colley,
                    s.massey,
                    s.elo,
                    s.elo_mov,
                    s.trueskill,
                    s.pagerank,
                    s.bradley_terry,
                    s.pca,
                    s.sos,
                    s.consistency,
                    s.borda,
                    s.integrated
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        debug!("Inserted snapshot {} with {} rows", id, total_teams);

        Ok(RankingSnapshot {
            id,
            created_at,
            total_teams,
            total_matches: snapshot.total_matches,
            metadata: snapshot.metadata,
        })
    }

    fn get_snapshot(&self, id: SnapshotId) -> Result<Option<RankingSnapshot>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("SELECT {SNAPSHOT_COLUMNS} FROM ranking_snapshots WHERE id = ?1"),
                params![id],
                SnapshotRecord::from_row,
            )
            .optional()
            .map_err(db_err)?;
        record.map(SnapshotRecord::decode).transpose()
    }

    fn history(&self, id: SnapshotId) -> Result<Vec<RankingHistoryRow>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {HISTORY_COLUMNS} FROM ranking_history
                 WHERE snapshot_id = ?1 ORDER BY position ASC, team_id ASC"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![id], history_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn list_snapshots(&self, limit: usize) -> Result<Vec<RankingSnapshot>> {
        let conn = self.lock()?;
        Self::query_snapshots(
            &conn,
            &format!("SELECT {SNAPSHOT_COLUMNS} FROM ranking_snapshots ORDER BY id DESC LIMIT ?1"),
            params![limit as i64],
        )
    }

    fn previous_snapshot(&self, id: SnapshotId) -> Result<Option<RankingSnapshot>> {
        let conn = self.lock()?;
        Ok(Self::query_snapshots(
            &conn,
            &format!(
                "SELECT {SNAPSHOT_COLUMNS} FROM ranking_snapshots
                 WHERE id < ?1 ORDER BY id DESC LIMIT 1"
            ),
            params![id],
        )?
        .into_iter()
        .next())
    }

    fn snapshots_since(&self, since: DateTime<Utc>) -> Result<Vec<RankingSnapshot>> {
        let conn = self.lock()?;
        Self::query_snapshots(
            &conn,
            &format!(
                "SELECT {SNAPSHOT_COLUMNS} FROM ranking_snapshots
                 WHERE created_at >= ?1 ORDER BY created_at ASC, id ASC"
            ),
            params![encode_time(&since)],
        )
    }

    fn snapshot_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ranking_snapshots", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(usize::try_from(count)?)
    }

    fn delete_snapshot(&self, id: SnapshotId) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM ranking_snapshots WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if !exists {
            return Ok(false);
        }
        let count: i64 = tx
            .query_row("SELECT COUNT(*) FROM ranking_snapshots", [], |row| row.get(0))
            .map_err(db_err)?;
        if count <= 1 {
            return Err(RankingError::CannotDeleteLastSnapshot { id }.into());
        }

        tx.execute("DELETE FROM ranking_snapshots WHERE id = ?1", params![id])
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(true)
    }

    fn team_history(
        &self,
        team_id: TeamId,
        limit: usize,
    ) -> Result<Vec<(RankingSnapshot, RankingHistoryRow)>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {HISTORY_COLUMNS} FROM ranking_history
                 WHERE team_id = ?1 ORDER BY snapshot_id DESC LIMIT ?2"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![team_id, limit as i64], history_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let record = conn
                .query_row(
                    &format!("SELECT {SNAPSHOT_COLUMNS} FROM ranking_snapshots WHERE id = ?1"),
                    params![row.snapshot_id],
                    SnapshotRecord::from_row,
                )
                .map_err(db_err)?;
            entries.push((record.decode()?, row));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::snapshot::NewHistoryRow;
    use chrono::{Duration, TimeZone};

    fn new_snapshot(created_at: DateTime<Utc>, teams: &[(TeamId, u32, f64)]) -> NewSnapshot {
        NewSnapshot {
            created_at,
            total_matches: 12,
            metadata: SnapshotMetadata::for_run(created_at),
            rows: teams
                .iter()
                .map(|&(team_id, position, score)| NewHistoryRow {
                    team_id,
                    position,
                    score,
                    ci_lower: (score - 10.0).max(0.0),
                    ci_upper: (score + 10.0).min(100.0),
                    uncertainty: 5.1,
                    games_count: 6,
                    scores: ComponentScores {
                        colley: 0.61,
                        elo: 1523.25,
                        borda: 21,
                        ..ComponentScores::default()
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_round_trip() {
        let store = SqliteSnapshotStore::open_in_memory().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let created = store
            .insert_snapshot(new_snapshot(at, &[(10, 2, 37.12), (11, 1, 100.0)]))
            .unwrap();

        assert_eq!(store.get_snapshot(created.id).unwrap(), Some(created.clone()));
        let rows = store.history(created.id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team_id, 11);
        assert_eq!(rows[1].score, 37.12);
        assert_eq!(rows[1].scores.elo, 1523.25);
        assert_eq!(rows[1].scores.borda, 21);
    }

    #[test]
    fn test_delete_cascades_and_guards_last() {
        let store = SqliteSnapshotStore::open_in_memory().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let first = store.insert_snapshot(new_snapshot(at, &[(1, 1, 80.0)])).unwrap();
        let second = store
            .insert_snapshot(new_snapshot(at + Duration::days(1), &[(1, 1, 70.0)]))
            .unwrap();

        assert!(store.delete_snapshot(first.id).unwrap());
        assert!(store.history(first.id).unwrap().is_empty());
        assert_eq!(store.team_history(1, 10).unwrap().len(), 1);

        let err = store.delete_snapshot(second.id).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RankingError>(),
            Some(&RankingError::CannotDeleteLastSnapshot { id: second.id })
        );
        assert_eq!(store.snapshot_count().unwrap(), 1);
    }

    #[test]
    fn test_ordering_queries() {
        let store = SqliteSnapshotStore::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        for day in 0..3 {
            store
                .insert_snapshot(new_snapshot(start + Duration::days(day * 7), &[(1, 1, 50.0)]))
                .unwrap();
        }

        let listed: Vec<SnapshotId> = store.list_snapshots(5).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(listed, vec![3, 2, 1]);
        assert_eq!(store.previous_snapshot(3).unwrap().map(|s| s.id), Some(2));
        assert!(store.previous_snapshot(1).unwrap().is_none());

        let window: Vec<SnapshotId> = store
            .snapshots_since(start + Duration::days(7))
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(window, vec![2, 3]);
    }
}
