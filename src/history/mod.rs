//! Snapshot persistence and history queries
//!
//! A snapshot is one immutable ranking run plus one row per persisted team.
//! [`HistoryManager`] turns ranking tables into snapshots and compares them.

pub mod delta;
pub mod evolution;
pub mod manager;
pub mod snapshot;
pub mod sqlite;
pub mod storage;

// Re-export commonly used types
pub use delta::{
    compare_snapshots, compute_deltas, delta_stats, DeltaStats, DroppedTeam, SnapshotComparison,
    TeamDelta,
};
pub use evolution::{EvolutionReport, EvolutionSummary, TOP_MOVERS};
pub use manager::{HistoryManager, LiveEntry, PruneReport, RankingEntry, TeamHistoryPoint};
pub use snapshot::{
    NewHistoryRow, NewSnapshot, RankingHistoryRow, RankingSnapshot, SnapshotExport,
    SnapshotMetadata, SNAPSHOT_FORMAT_VERSION,
};
pub use sqlite::SqliteSnapshotStore;
pub use storage::{InMemorySnapshotStore, SnapshotStore};
