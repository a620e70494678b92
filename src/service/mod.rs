//! Service layer for the ranking engine
//!
//! The facade the surrounding system calls: protected snapshot administration,
//! history queries, per-map ratings and the deadline wrapper around a batch run.

pub mod ranking;

pub use ranking::{run_with_deadline, LiveRanking, RankingService};
