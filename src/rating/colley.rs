//! Colley matrix rating

use crate::canonical::MatchTable;
use crate::error::Result;
use crate::rating::{ModelOutput, Rater};
use crate::types::RatingModel;
use nalgebra::{DMatrix, DVector};

/// Colley's method with time-weighted games
#[derive(Debug, Clone, Default)]
pub struct ColleyRater;

pub const COLLEY_NEUTRAL: f64 = 0.5;

impl ColleyRater {
    pub fn new() -> Self {
        Self
    }

    /// Build `C` and `b` of the Colley system `C·r = b`
    fn system(table: &MatchTable) -> (DMatrix<f64>, DVector<f64>) {
        let n = table.team_count();
        let mut c = DMatrix::<f64>::zeros(n, n);
        let mut b = DVector::<f64>::from_element(n, 1.0);
        for idx in 0..n {
            c[(idx, idx)] = 2.0;
        }

        for m in table.matches() {
            let (i, j, w) = (m.i, m.j, m.time_weight);
            c[(i, i)] += w;
            c[(j, j)] += w;
            c[(i, j)] -= w;
            c[(j, i)] -= w;

            if m.win_i {
                b[i] += w / 2.0;
                b[j] -= w / 2.0;
            } else if m.win_j {
                b[j] += w / 2.0;
                b[i] -= w / 2.0;
            }
        }

        (c, b)
    }
}

impl Rater for ColleyRater {
    fn model(&self) -> RatingModel {
        RatingModel::Colley
    }

    fn neutral(&self, _team_count: usize) -> f64 {
        COLLEY_NEUTRAL
    }

    fn rate(&self, table: &MatchTable) -> Result<ModelOutput> {
        let n = table.team_count();
        let (c, b) = Self::system(table);

        // Symmetric positive definite in exact arithmetic; LU covers numerical loss of definiteness
        let solved = match c.clone().cholesky() {
            Some(chol) => Some(chol.solve(&b)),
            None => c.lu().solve(&b),
        };
        match solved {
            Some(r) => Ok(ModelOutput::computed(self.model(), r.iter().copied().collect())),
            None => Ok(ModelOutput::fallback(
                self.model(),
                vec![COLLEY_NEUTRAL; n],
                "singular Colley matrix",
            )),
        }
    }
}
