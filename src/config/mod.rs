//! Configuration management for the ranking engine
//!
//! This module handles configuration loading from files and environment
//! variables, validation, and the default constants of every pipeline stage.

pub mod app;
pub mod engine;
pub mod map;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings, StorageSettings};
pub use engine::{
    AnomalyConfig, BlendConfig, CentralityConfig, ConfidenceConfig, ConsistencyConfig,
    DecayConfig, EloConfig, EngineConfig, PairwiseConfig, SkillConfig,
};
pub use map::{MapRatingConfig, MapWeights};
