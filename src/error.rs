//! Error types for the ranking engine
//!
//! Hard failures travel as `anyhow::Error`; the variants below are the ones a
//! caller is expected to match on (via `downcast_ref`).

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific ranking scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RankingError {
    #[error("No valid matches left after canonicalization")]
    EmptyInput,

    #[error("No ranked team could be resolved to a stored team identity")]
    NoResolvableTeams,

    #[error("Snapshot not found: {id}")]
    SnapshotNotFound { id: i64 },

    #[error("Cannot delete snapshot {id}: it is the last remaining snapshot")]
    CannotDeleteLastSnapshot { id: i64 },

    #[error("Invalid or missing administrative credential")]
    Unauthorized,

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Ranking computation exceeded its {seconds:.3}s deadline")]
    DeadlineExceeded { seconds: f64 },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Internal engine error: {message}")]
    InternalError { message: String },
}

impl From<rusqlite::Error> for RankingError {
    fn from(err: rusqlite::Error) -> Self {
        RankingError::StorageError {
            message: err.to_string(),
        }
    }
}

/// Returns the [`RankingError`] behind an `anyhow::Error`, if there is one.
pub fn ranking_error(err: &anyhow::Error) -> Option<&RankingError> {
    err.downcast_ref::<RankingError>()
}
