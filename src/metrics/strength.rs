//! Strength of schedule

use crate::canonical::MatchTable;
use crate::error::{RankingError, Result};
use crate::utils::standardize;

/// Time-weighted mean rating of every opponent faced, standardized across
/// teams. A team without matches starts from 0 before standardization.
pub fn strength_of_schedule(table: &MatchTable, ratings: &[f64]) -> Result<Vec<f64>> {
    let n = table.team_count();
    if ratings.len() != n {
        return Err(RankingError::InternalError {
            message: format!("{} opponent ratings for {} teams", ratings.len(), n),
        }
        .into());
    }

    let mut weighted_sum = vec![0.0; n];
    let mut weight_total = vec![0.0; n];
    for m in table.matches() {
        weighted_sum[m.i] += m.time_weight * ratings[m.j];
        weight_total[m.i] += m.time_weight;
        weighted_sum[m.j] += m.time_weight * ratings[m.i];
        weight_total[m.j] += m.time_weight;
    }

    let raw: Vec<f64> = weighted_sum
        .iter()
        .zip(&weight_total)
        .map(|(&sum, &total)| if total > 0.0 { sum / total } else { 0.0 })
        .collect();

    Ok(standardize(&raw))
}
