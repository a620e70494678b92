//! Per-model normalization and rank aggregation

use crate::rating::ModelOutput;
use crate::utils::{round2, standardize};

/// Z-scores of each model's output, one vector per model
pub fn z_scores(outputs: &[ModelOutput]) -> Vec<Vec<f64>> {
    outputs.iter().map(|o| standardize(&o.scores)).collect()
}

/// Best-to-worst rank of each value; ties share the lowest rank of their group
pub fn min_ranks(values: &[f64]) -> Vec<usize> {
    values
        .iter()
        .map(|v| 1 + values.iter().filter(|other| *other > v).count())
        .collect()
}

/// Borda count: `Σ (N − rank + 1)` over all models
pub fn borda_scores(outputs: &[ModelOutput]) -> Vec<u32> {
    let n = outputs.first().map(|o| o.scores.len()).unwrap_or(0);
    let mut borda = vec![0u32; n];
    for output in outputs {
        for (team, rank) in min_ranks(&output.scores).into_iter().enumerate() {
            borda[team] += (n - rank + 1) as u32;
        }
    }
    borda
}

/// Min-max rescale to [0, 100], two decimals. Degenerate input maps to 50.
pub fn rescale_to_percent(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let spread = max - min;
    if !(spread.is_finite() && spread > 0.0) {
        return vec![50.0; values.len()];
    }
    values
        .iter()
        .map(|v| round2(100.0 * (v - min) / spread))
        .collect()
}

/// Per-team row view of column vectors: `rows[team][model]`
pub fn transpose(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = columns.first().map(Vec::len).unwrap_or(0);
    (0..n)
        .map(|team| columns.iter().map(|column| column[team]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RatingModel;

    #[test]
    fn test_min_ranks_with_ties() {
        assert_eq!(min_ranks(&[3.0, 5.0, 3.0, 1.0]), vec![2, 1, 2, 4]);
        assert_eq!(min_ranks(&[2.0, 2.0]), vec![1, 1]);
    }

    #[test]
    fn test_borda_scores() {
        let outputs = vec![
            ModelOutput::computed(RatingModel::Colley, vec![0.7, 0.3, 0.5]),
            ModelOutput::computed(RatingModel::Massey, vec![1.0, 1.0, -2.0]),
        ];
        // Colley ranks 1,3,2 -> 3,1,2; Massey ranks 1,1,3 -> 3,3,1
        assert_eq!(borda_scores(&outputs), vec![6, 4, 3]);
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale_to_percent(&[-1.0, 0.0, 3.0]), vec![0.0, 25.0, 100.0]);
        assert_eq!(rescale_to_percent(&[2.0, 2.0]), vec![50.0, 50.0]);
        assert_eq!(rescale_to_percent(&[1.0, f64::NAN]), vec![50.0, 50.0]);
    }

    #[test]
    fn test_transpose() {
        let rows = transpose(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(rows, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }
}
