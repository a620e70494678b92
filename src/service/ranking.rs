//! Ranking service facade
//!
//! Wires the engine, the map calculator and the history manager together and
//! exposes the operations of the surrounding system: credential-gated
//! snapshot administration and read-only queries.

use crate::aggregate::{RankingEngine, RankingTable, RunDiagnostics, RunSummary};
use crate::config::AppConfig;
use crate::error::{RankingError, Result};
use crate::history::{
    EvolutionSummary, HistoryManager, InMemorySnapshotStore, LiveEntry, PruneReport,
    RankingEntry, RankingSnapshot, SnapshotComparison, SnapshotExport, SnapshotStore,
    SqliteSnapshotStore, TeamHistoryPoint,
};
use crate::map_rating::{MapRating, MapRatingCalculator};
use crate::types::{Match, SnapshotId, Team, TeamId};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A freshly computed ranking annotated against the latest snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveRanking {
    pub computed_at: DateTime<Utc>,
    pub total_matches: usize,
    pub summary: RunSummary,
    pub diagnostics: RunDiagnostics,
    pub entries: Vec<LiveEntry>,
}

/// Run a blocking closure on the blocking pool, bounded by `deadline`.
///
/// The closure keeps running to completion in the background if the deadline
/// fires; only its result is discarded.
pub async fn run_with_deadline<T, F>(deadline: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(task_failed(join_err)),
        Err(_) => {
            warn!("Ranking computation exceeded its {:?} deadline", deadline);
            Err(RankingError::DeadlineExceeded {
                seconds: deadline.as_secs_f64(),
            }
            .into())
        }
    }
}

fn task_failed(join_err: tokio::task::JoinError) -> anyhow::Error {
    RankingError::InternalError {
        message: format!("Ranking task failed: {}", join_err),
    }
    .into()
}

pub struct RankingService {
    engine: Arc<RankingEngine>,
    map_calculator: MapRatingCalculator,
    history: HistoryManager,
    admin_key: Option<String>,
    compute_timeout: Duration,
}

impl std::fmt::Debug for RankingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingService")
            .field("history", &self.history)
            .field("admin_key_configured", &self.admin_key.is_some())
            .field("compute_timeout", &self.compute_timeout)
            .finish_non_exhaustive()
    }
}

impl RankingService {
    /// Build the service over an existing snapshot store
    pub fn new(config: &AppConfig, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        let engine = RankingEngine::new(config.engine.clone())?;
        let map_calculator = MapRatingCalculator::new(config.map.clone())?;
        if config.service.admin_key.is_none() {
            warn!("No admin key configured; snapshot administration is disabled");
        }

        Ok(Self {
            engine: Arc::new(engine),
            map_calculator,
            history: HistoryManager::new(store, config.storage.min_retained_snapshots),
            admin_key: config.service.admin_key.clone(),
            compute_timeout: config.compute_timeout(),
        })
    }

    /// Build the service with the store selected by the configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn SnapshotStore> = match &config.storage.database_path {
            Some(path) => {
                info!("Using SQLite snapshot store at {}", path.display());
                Arc::new(SqliteSnapshotStore::open(path)?)
            }
            None => {
                info!("Using in-memory snapshot store");
                Arc::new(InMemorySnapshotStore::new())
            }
        };
        Self::new(config, store)
    }

    pub fn with_compute_timeout(mut self, timeout: Duration) -> Self {
        self.compute_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &RankingEngine {
        &self.engine
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    fn authorize(&self, credential: Option<&str>) -> Result<()> {
        match (&self.admin_key, credential) {
            (Some(expected), Some(given)) if expected == given => Ok(()),
            _ => {
                warn!("Rejected administrative request: invalid or missing credential");
                Err(RankingError::Unauthorized.into())
            }
        }
    }

    /// Compute a ranking without persisting it
    pub fn compute(&self, teams: &[Team], matches: &[Match]) -> Result<RankingTable> {
        self.engine.compute(teams, matches)
    }

    /// Compute on the blocking pool under the configured deadline
    pub async fn compute_with_deadline(
        &self,
        teams: Vec<Team>,
        matches: Vec<Match>,
    ) -> Result<RankingTable> {
        let engine = Arc::clone(&self.engine);
        run_with_deadline(self.compute_timeout, move || engine.compute(&teams, &matches)).await
    }

    /// Current ranking with variations against the latest stored snapshot
    pub fn live_ranking(&self, teams: &[Team], matches: &[Match]) -> Result<LiveRanking> {
        let table = self.engine.compute(teams, matches)?;
        let entries = self.history.live_variations(&table)?;
        Ok(LiveRanking {
            computed_at: table.computed_at,
            total_matches: table.total_matches,
            summary: table.summary,
            diagnostics: table.diagnostics,
            entries,
        })
    }

    /// Compute and persist a new snapshot (protected)
    pub fn create_snapshot(
        &self,
        credential: Option<&str>,
        teams: &[Team],
        matches: &[Match],
    ) -> Result<RankingSnapshot> {
        self.authorize(credential)?;
        let table = self.engine.compute(teams, matches)?;
        self.history.persist(&table)
    }

    /// [`RankingService::create_snapshot`] with the computation under the deadline.
    ///
    /// Persisting also runs on the blocking pool but outside the deadline, so
    /// a `DeadlineExceeded` error never leaves a snapshot behind.
    pub async fn create_snapshot_with_deadline(
        &self,
        credential: Option<&str>,
        teams: Vec<Team>,
        matches: Vec<Match>,
    ) -> Result<RankingSnapshot> {
        self.authorize(credential)?;
        let table = self.compute_with_deadline(teams, matches).await?;
        let history = self.history.clone();
        tokio::task::spawn_blocking(move || history.persist(&table))
            .await
            .map_err(task_failed)?
    }

    /// Delete a snapshot (protected); never the last one
    pub fn delete_snapshot(&self, credential: Option<&str>, id: SnapshotId) -> Result<()> {
        self.authorize(credential)?;
        self.history.delete(id)
    }

    /// Keep the `keep` most recent snapshots (protected)
    pub fn prune_snapshots(&self, credential: Option<&str>, keep: usize) -> Result<PruneReport> {
        self.authorize(credential)?;
        self.history.prune(keep)
    }

    pub fn snapshot_ranking(&self, id: SnapshotId) -> Result<Vec<RankingEntry>> {
        self.history.ranking_with_variations(id)
    }

    pub fn compare(&self, from: SnapshotId, to: SnapshotId) -> Result<SnapshotComparison> {
        self.history.compare(from, to)
    }

    pub fn compare_with_previous(&self, id: SnapshotId) -> Result<Option<SnapshotComparison>> {
        self.history.compare_with_previous(id)
    }

    pub fn evolution(&self, days: u32) -> Result<EvolutionSummary> {
        self.history.evolution(days, current_timestamp())
    }

    pub fn list_snapshots(&self, limit: usize) -> Result<Vec<RankingSnapshot>> {
        self.history.list(limit)
    }

    pub fn team_history(&self, team_id: TeamId, limit: usize) -> Result<Vec<TeamHistoryPoint>> {
        self.history.team_history(team_id, limit)
    }

    pub fn export_snapshot(&self, id: SnapshotId, path: &Path) -> Result<SnapshotExport> {
        self.history.export_to_file(id, path)
    }

    pub fn map_rating(&self, matches: &[Match], team: &str, map: &str) -> Result<MapRating> {
        self.map_calculator.rate(matches, team, map)
    }
}
