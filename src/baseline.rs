//! Baseline statistics over the historical intervals of a slice.
//!
//! Every intermediate value is rounded to two decimals, in order: mean,
//! each squared deviation, their sum, dispersion, deviation, error.
//!
//! Two rounding rules are in play so stored scores match the historical
//! series. Mean, deviations, their sum and the dispersion are scaled by 100
//! and rounded half to even ([`round_half_even2`]). Deviation and error are
//! rounded on the exact decimal value of the float ([`round_decimal2`]).
//!
//! The dispersion divisor is `total_intervals - 1` and the error divisor is
//! `sqrt(total_intervals)`, where `total_intervals` includes the current
//! interval.

use crate::error::{Result, ScoringError};
use crate::models::BaselineStats;

/// Scales by 100, rounds ties to even, scales back.
pub fn round_half_even2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Rounds to two decimals against the exact binary value of `value`, so
/// `0.235` (stored just below) becomes `0.23`. True ties go to even.
pub fn round_decimal2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let floor = (value * 100.0).floor();
    let midpoint = 2.0 * floor + 1.0;

    // value * 200 split into product plus its exact residual.
    let product = value * 200.0;
    let residual = value.mul_add(200.0, -product);
    let side = (product - midpoint) + residual;

    let hundredths = if side < 0.0 {
        floor
    } else if side > 0.0 {
        floor + 1.0
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };

    hundredths / 100.0
}

pub fn estimate(historical: &[usize], total_intervals: usize) -> Result<BaselineStats> {
    if historical.is_empty() {
        return Err(ScoringError::InsufficientHistory(
            "no historical intervals to build a baseline from".to_string(),
        ));
    }
    if total_intervals != historical.len() + 1 {
        return Err(ScoringError::InvalidInput(format!(
            "{} historical counts do not match {} total intervals",
            historical.len(),
            total_intervals
        )));
    }

    let samples = historical.len() as f64;
    let mean = round_half_even2(historical.iter().sum::<usize>() as f64 / samples);

    let sum_sq_dev = round_half_even2(
        historical
            .iter()
            .map(|count| round_half_even2((*count as f64 - mean).powi(2)))
            .sum(),
    );

    let dispersion = round_half_even2(sum_sq_dev / (total_intervals - 1) as f64);
    let standard_deviation = round_decimal2(dispersion.sqrt());
    let standard_error = round_decimal2(standard_deviation / (total_intervals as f64).sqrt());

    Ok(BaselineStats {
        mean,
        dispersion,
        standard_deviation,
        standard_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_history_scenario() {
        let history = [20, 22, 18, 21, 19, 20, 23, 21];
        let stats = estimate(&history, 9).unwrap();

        assert!((stats.mean - 20.5).abs() < 1e-9);
        assert!((stats.dispersion - 2.25).abs() < 1e-9);
        assert!((stats.standard_deviation - 1.5).abs() < 1e-9);
        assert!((stats.standard_error - 0.5).abs() < 1e-9);
    }

    #[test]
    fn identical_counts_have_no_spread() {
        let stats = estimate(&[6; 8], 9).unwrap();
        assert_eq!(stats.mean, 6.0);
        assert_eq!(stats.dispersion, 0.0);
        assert_eq!(stats.standard_error, 0.0);
    }

    #[test]
    fn mean_ignores_order() {
        let forward = estimate(&[3, 9, 4, 0, 12, 7, 5, 1], 9).unwrap();
        let shuffled = estimate(&[12, 0, 1, 9, 5, 3, 7, 4], 9).unwrap();
        assert_eq!(forward.mean, shuffled.mean);
        assert_eq!(forward.standard_error, shuffled.standard_error);
    }

    #[test]
    fn rounds_intermediate_values() {
        // mean 1/3 -> 0.33, deviations 0.1089 -> 0.11 and 0.4489 -> 0.45
        let stats = estimate(&[0, 0, 1], 4).unwrap();
        assert_eq!(stats.mean, 0.33);
        // (0.11 + 0.11 + 0.45) / 3 = 0.2233 -> 0.22
        assert_eq!(stats.dispersion, 0.22);
        assert_eq!(stats.standard_deviation, 0.47);
        // 0.47 / 2 is stored just below 0.235
        assert_eq!(stats.standard_error, 0.23);
    }

    #[test]
    fn mean_ties_round_to_even() {
        // 161 / 8 = 20.125 exactly
        let stats = estimate(&[20, 20, 20, 20, 20, 20, 20, 21], 9).unwrap();
        assert_eq!(stats.mean, 20.12);

        // 165 / 8 = 20.625 exactly
        let stats = estimate(&[20, 20, 20, 20, 20, 21, 22, 22], 9).unwrap();
        assert_eq!(stats.mean, 20.62);

        // 163 / 8 = 20.375 exactly, even neighbour is above
        let stats = estimate(&[20, 20, 20, 20, 20, 21, 21, 21], 9).unwrap();
        assert_eq!(stats.mean, 20.38);
    }

    #[test]
    fn half_even_rounding_follows_scaled_value() {
        assert_eq!(round_half_even2(0.125), 0.12);
        assert_eq!(round_half_even2(0.375), 0.38);
        assert_eq!(round_half_even2(20.125), 20.12);
        assert_eq!(round_half_even2(-0.125), -0.12);
    }

    #[test]
    fn decimal_rounding_uses_exact_float_value() {
        // 0.235 and 2.675 are stored just below their written value
        assert_eq!(round_decimal2(0.235), 0.23);
        assert_eq!(round_decimal2(2.675), 2.67);
        // exact binary ties go to even
        assert_eq!(round_decimal2(0.125), 0.12);
        assert_eq!(round_decimal2(0.375), 0.38);
        assert_eq!(round_decimal2(1.5), 1.5);
        assert_eq!(round_decimal2(0.469041575982343), 0.47);
    }

    #[test]
    fn empty_history_is_insufficient() {
        let err = estimate(&[], 1).unwrap_err();
        assert!(matches!(err, ScoringError::InsufficientHistory(_)));
    }

    #[test]
    fn mismatched_interval_total_is_rejected() {
        let err = estimate(&[1, 2, 3], 9).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(_)));
    }
}
