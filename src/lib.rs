//! Ranking Engine - multi-model team rankings with snapshot history
//!
//! This crate fuses seven independent rating models into one composite 0-100
//! score with a confidence band, persists successive runs as snapshots, and
//! compares snapshots over time. A lighter per-map variant rates one team on
//! a single map.

pub mod aggregate;
pub mod canonical;
pub mod config;
pub mod error;
pub mod history;
pub mod map_rating;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RankingError, Result};
pub use types::*;

// Re-export key components
pub use aggregate::{RankingEngine, RankingTable};
pub use history::{HistoryManager, InMemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
pub use map_rating::MapRatingCalculator;
pub use service::RankingService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
