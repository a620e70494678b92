//! Typed model results
//!
//! A model either computes its scores normally or degrades to a documented
//! neutral vector. Both are successful results; callers tell them apart by
//! [`ModelStatus`].

use crate::types::RatingModel;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a model produced its scores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelStatus {
    Computed,
    Fallback { reason: String },
}

/// One scalar per team, indexed like the match table's team list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub model: RatingModel,
    pub scores: Vec<f64>,
    pub status: ModelStatus,
}

impl ModelOutput {
    pub fn computed(model: RatingModel, scores: Vec<f64>) -> Self {
        Self {
            model,
            scores,
            status: ModelStatus::Computed,
        }
    }

    /// Neutral result used when the computation failed numerically
    pub fn fallback(model: RatingModel, scores: Vec<f64>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("{} model fell back to neutral scores: {}", model, reason);
        Self {
            model,
            scores,
            status: ModelStatus::Fallback { reason },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.status, ModelStatus::Fallback { .. })
    }

    /// Replace a result containing NaN or infinities with `neutral` for every team
    pub fn sanitized(self, neutral: f64) -> Self {
        if self.scores.iter().all(|s| s.is_finite()) {
            return self;
        }
        let n = self.scores.len();
        Self::fallback(self.model, vec![neutral; n], "non-finite scores")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_keeps_finite_output() {
        let output = ModelOutput::computed(RatingModel::Massey, vec![1.0, -1.0]);
        let sanitized = output.clone().sanitized(0.0);
        assert_eq!(sanitized, output);
        assert!(!sanitized.is_fallback());
    }

    #[test]
    fn test_sanitized_replaces_nan() {
        let output = ModelOutput::computed(RatingModel::Massey, vec![f64::NAN, 2.0]);
        let sanitized = output.sanitized(0.0);
        assert!(sanitized.is_fallback());
        assert_eq!(sanitized.scores, vec![0.0, 0.0]);
        assert_eq!(
            sanitized.status,
            ModelStatus::Fallback {
                reason: "non-finite scores".to_string()
            }
        );
    }
}
