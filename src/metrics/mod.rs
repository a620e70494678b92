//! Auxiliary metrics: strength of schedule and consistency

pub mod consistency;
pub mod strength;

// Re-export commonly used types
pub use consistency::{consistency_scores, team_consistency};
pub use strength::strength_of_schedule;
