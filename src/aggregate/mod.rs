//! Aggregation of the model outputs into one composite ranking
//!
//! Z-scores, Borda count, principal component, optional outlier pass, blend,
//! 0-100 rescale and confidence band, driven by [`RankingEngine`].

pub mod anomaly;
pub mod confidence;
pub mod engine;
pub mod normalize;
pub mod pca;

// Re-export commonly used types
pub use confidence::{confidence_band, ConfidenceBand};
pub use engine::{ModelReport, RankingEngine, RankingTable, RunDiagnostics, RunSummary};
