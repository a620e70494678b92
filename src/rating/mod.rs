//! Rating Model Suite
//!
//! Seven independent models, each a pure function of the canonical match
//! table producing one scalar per team.

pub mod centrality;
pub mod colley;
pub mod elo;
pub mod margin;
pub mod massey;
pub mod optimize;
pub mod outcome;
pub mod pairwise;
pub mod skill;
pub mod suite;

use crate::canonical::MatchTable;
use crate::error::Result;
use crate::types::RatingModel;

// Re-export commonly used types
pub use centrality::CentralityRater;
pub use colley::ColleyRater;
pub use elo::EloRater;
pub use margin::margin_adjustment;
pub use massey::MasseyRater;
pub use outcome::{ModelOutput, ModelStatus};
pub use pairwise::PairwiseRater;
pub use skill::SkillRater;
pub use suite::{RatingSuite, SuiteOutput};

/// A rating model over the canonical match table
pub trait Rater: Send + Sync {
    /// Which model this rater implements
    fn model(&self) -> RatingModel;

    /// Score given to every team when the model has to fall back
    fn neutral(&self, team_count: usize) -> f64;

    /// Rate every team of `table`.
    ///
    /// Numerical trouble yields `Ok` with a fallback status; `Err` is reserved
    /// for broken inputs.
    fn rate(&self, table: &MatchTable) -> Result<ModelOutput>;
}
