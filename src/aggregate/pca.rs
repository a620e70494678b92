//! First principal component of the standardized model outputs

use nalgebra::{DMatrix, SymmetricEigen};

/// Projection of every team onto the first principal component.
///
/// `rows[team][model]`. The component is oriented so that its loadings sum
/// to a non-negative value, which keeps "higher is stronger".
pub fn first_component_scores(rows: &[Vec<f64>]) -> Vec<f64> {
    let n = rows.len();
    let dims = rows.first().map(Vec::len).unwrap_or(0);
    if n == 0 || dims == 0 {
        return vec![0.0; n];
    }

    let data = DMatrix::from_fn(n, dims, |r, c| rows[r][c]);
    let means = data.row_mean();
    let centered = DMatrix::from_fn(n, dims, |r, c| data[(r, c)] - means[c]);
    let covariance = centered.transpose() * &centered / n as f64;

    let eigen = SymmetricEigen::new(covariance);
    let leading = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (idx, &value)| {
            if value > best.1 {
                (idx, value)
            } else {
                best
            }
        })
        .0;

    let mut loadings = eigen.eigenvectors.column(leading).into_owned();
    if loadings.sum() < 0.0 {
        loadings = -loadings;
    }

    let projection = centered * loadings;
    projection
        .iter()
        .map(|v| if v.is_finite() { *v } else { 0.0 })
        .collect()
}
