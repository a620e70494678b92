//! Utility functions for the ranking engine

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Round to two decimals (half away from zero)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (N denominator); 0 for an empty slice
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Standardize to zero mean / unit variance. A zero spread divides by 1.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let mut s = population_std(values);
    if s == 0.0 || !s.is_finite() {
        s = 1.0;
    }
    values.iter().map(|v| (v - m) / s).collect()
}

/// Compare two floats treating NaN as equal (for sorting)
pub fn cmp_f64(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_000_1), 1.24);
        assert_eq!(round2(-1.234), -1.23);
        assert_eq!(round2(-0.005_000_1), -0.01);
    }

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(population_std(&values), 2.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
    }

    #[test]
    fn test_standardize_constant_input() {
        let z = standardize(&[3.0, 3.0, 3.0]);
        assert_eq!(z, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_standardize_unit_variance() {
        let z = standardize(&[1.0, 2.0, 3.0, 4.0]);
        assert!(mean(&z).abs() < 1e-12);
        assert!((population_std(&z) - 1.0).abs() < 1e-12);
    }
}
