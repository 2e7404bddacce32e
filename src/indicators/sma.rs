// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// The arithmetic mean of the trailing `period` closes. The engine evaluates
// three stacked SMAs (5/10/20) and reads trend direction from their ordering.
// =============================================================================

/// Compute the SMA of the last `period` values in `closes`.
///
/// # Edge cases
/// - `period == 0` => `None` (division by zero guard)
/// - `closes.len() < period` => `None` — the indicator is undefined, not zero
/// - Non-finite result => `None`
pub fn calculate_sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let sum: f64 = closes[closes.len() - period..].iter().sum();
    let sma = sum / period as f64;

    sma.is_finite().then_some(sma)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_empty_input() {
        assert!(calculate_sma(&[], 5).is_none());
    }

    #[test]
    fn sma_period_zero() {
        assert!(calculate_sma(&[1.0, 2.0, 3.0], 0).is_none());
    }

    #[test]
    fn sma_insufficient_data() {
        // 19 closes cannot produce an SMA-20.
        let closes: Vec<f64> = (1..=19).map(|x| x as f64).collect();
        assert!(calculate_sma(&closes, 20).is_none());
    }

    #[test]
    fn sma_exact_window() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sma = calculate_sma(&closes, 5).unwrap();
        assert!((sma - 3.0).abs() < 1e-12);
    }

    #[test]
    fn sma_uses_trailing_window_only() {
        // Leading values must not influence the result.
        let closes = [100.0, 200.0, 1.0, 2.0, 3.0];
        let sma = calculate_sma(&closes, 3).unwrap();
        assert!((sma - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sma_twenty_period() {
        // (100 + 101 + ... + 119) / 20 = 109.5
        let closes: Vec<f64> = (100..120).map(|x| x as f64).collect();
        let sma = calculate_sma(&closes, 20).unwrap();
        assert!((sma - 109.5).abs() < 1e-12);
    }
}
