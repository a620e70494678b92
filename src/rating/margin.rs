//! Margin-of-victory adjustment shared by Massey, Elo-with-margin and centrality

use std::f64::consts::PI;

/// Bounded influence of a score differential.
///
/// `(2/π)·atan(2·margin/total) · (1 + 0.1·ln(1 + total))`, or 0 when no
/// points were scored.
pub fn margin_adjustment(margin: u32, total_points: u32) -> f64 {
    if total_points == 0 {
        return 0.0;
    }
    let margin = f64::from(margin);
    let total = f64::from(total_points);
    let damped = (2.0 / PI) * (2.0 * margin / total).atan();
    damped * (1.0 + 0.1 * total.ln_1p())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_total_is_zero() {
        assert_eq!(margin_adjustment(0, 0), 0.0);
    }

    #[test]
    fn test_draw_is_zero() {
        assert_eq!(margin_adjustment(0, 24), 0.0);
    }

    #[test]
    fn test_blowout_exceeds_close_game() {
        let close = margin_adjustment(1, 25);
        let blowout = margin_adjustment(13, 13);
        assert!(blowout > close);
        assert!(close > 0.0);
    }

    #[test]
    fn test_known_value() {
        // 13-0: atan(2) scaled, times 1 + 0.1 ln 14
        let expected = (2.0 / PI) * 2.0_f64.atan() * (1.0 + 0.1 * 14.0_f64.ln());
        assert!((margin_adjustment(13, 13) - expected).abs() < 1e-12);
    }
}
