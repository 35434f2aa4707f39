use crate::error::{Result, ScoringError};
use crate::models::WorkloadScore;

/// Truncated `[mean - se, mean + se]` band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToleranceBand {
    pub left: i64,
    pub right: i64,
}

impl ToleranceBand {
    pub fn from_baseline(mean: f64, standard_error: f64) -> Result<Self> {
        if !mean.is_finite() || mean < 0.0 {
            return Err(ScoringError::InvalidInput(format!(
                "baseline mean must be a non-negative number, got {mean}"
            )));
        }
        if !standard_error.is_finite() || standard_error < 0.0 {
            return Err(ScoringError::InvalidInput(format!(
                "standard error must be a non-negative number, got {standard_error}"
            )));
        }

        // Truncation toward zero, not rounding.
        Ok(Self {
            left: (mean - standard_error).trunc() as i64,
            right: (mean + standard_error).trunc() as i64,
        })
    }

    pub fn classify(&self, current_count: i64) -> Result<WorkloadScore> {
        if current_count < 0 {
            return Err(ScoringError::InvalidInput(format!(
                "current interval count cannot be negative, got {current_count}"
            )));
        }

        let score = if self.left == 0 && self.right == 0 && current_count == 0 {
            WorkloadScore::UnderLoaded
        } else if current_count < self.left {
            WorkloadScore::UnderLoaded
        } else if current_count <= self.right {
            WorkloadScore::Normal
        } else {
            WorkloadScore::OverLoaded
        };
        Ok(score)
    }
}

pub fn classify(mean: f64, standard_error: f64, current_count: i64) -> Result<WorkloadScore> {
    ToleranceBand::from_baseline(mean, standard_error)?.classify(current_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_truncated() {
        let band = ToleranceBand::from_baseline(196.62, 9.43).unwrap();
        assert_eq!(band, ToleranceBand { left: 187, right: 206 });

        let band = ToleranceBand::from_baseline(0.4, 0.5).unwrap();
        assert_eq!(band, ToleranceBand { left: 0, right: 0 });
    }

    #[test]
    fn count_inside_band_is_normal() {
        assert_eq!(classify(196.62, 9.43, 196).unwrap(), WorkloadScore::Normal);
        assert_eq!(classify(20.5, 0.5, 20).unwrap(), WorkloadScore::Normal);
        assert_eq!(classify(20.5, 0.5, 21).unwrap(), WorkloadScore::Normal);
    }

    #[test]
    fn count_below_band_is_under_loaded() {
        assert_eq!(classify(20.5, 0.5, 19).unwrap(), WorkloadScore::UnderLoaded);
        assert_eq!(classify(20.5, 0.5, 0).unwrap(), WorkloadScore::UnderLoaded);
    }

    #[test]
    fn count_above_band_is_over_loaded() {
        assert_eq!(classify(5.0, 0.4, 50).unwrap(), WorkloadScore::OverLoaded);
        assert_eq!(classify(20.5, 0.5, 22).unwrap(), WorkloadScore::OverLoaded);
    }

    #[test]
    fn all_zero_is_under_loaded() {
        assert_eq!(classify(0.0, 0.0, 0).unwrap(), WorkloadScore::UnderLoaded);
    }

    #[test]
    fn any_activity_on_an_empty_baseline_is_over_loaded() {
        assert_eq!(classify(0.0, 0.0, 1).unwrap(), WorkloadScore::OverLoaded);
    }

    #[test]
    fn score_never_decreases_as_count_grows() {
        for left in 0..6 {
            for right in left..8 {
                let band = ToleranceBand { left, right };
                let mut previous = WorkloadScore::UnderLoaded;
                for current in 0..12 {
                    let score = band.classify(current).unwrap();
                    assert!(score >= previous, "band {left}..={right}, current {current}");
                    if current >= left && current <= right && !(right == 0 && current == 0) {
                        assert_eq!(score, WorkloadScore::Normal);
                    }
                    previous = score;
                }
            }
        }
    }

    #[test]
    fn negative_count_is_rejected() {
        let err = classify(3.0, 1.0, -1).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(_)));
    }

    #[test]
    fn non_finite_baseline_is_rejected() {
        assert!(classify(f64::NAN, 0.0, 1).is_err());
        assert!(classify(1.0, -0.5, 1).is_err());
    }
}
