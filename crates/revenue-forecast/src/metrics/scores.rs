//! Regression scores.

/// A single row's contribution to the mean absolute error.
#[inline]
pub fn absolute_error(actual: f64, predicted: f64) -> f64 {
    (actual - predicted).abs()
}

/// Mean of `|actual - predicted|`. NaN for empty input.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return f64::NAN;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| absolute_error(*a, *p))
        .sum();
    total / actual.len() as f64
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// Undefined (NaN) for fewer than two rows. When every actual value is the
/// same, SS_tot is zero and the score is 1.0 for a perfect fit, 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.len() < 2 {
        return f64::NAN;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_error_contribution() {
        assert_eq!(absolute_error(100.0, 90.0), 10.0);
        assert_eq!(absolute_error(90.0, 100.0), 10.0);
    }

    #[test]
    fn test_mean_absolute_error() {
        let actual = [100.0, 50.0, 20.0];
        let predicted = [90.0, 55.0, 20.0];
        assert!((mean_absolute_error(&actual, &predicted) - 5.0).abs() < 1e-12);
        assert!(mean_absolute_error(&[], &[]).is_nan());
    }

    #[test]
    fn test_r2_perfect_and_mean_predictor() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(r2_score(&actual, &actual), 1.0);
        assert_eq!(r2_score(&actual, &[2.5; 4]), 0.0);
    }

    #[test]
    fn test_r2_known_value() {
        let actual = [3.0, -0.5, 2.0, 7.0];
        let predicted = [2.5, 0.0, 2.0, 8.0];
        assert!((r2_score(&actual, &predicted) - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn test_r2_degenerate_inputs() {
        assert!(r2_score(&[5.0], &[4.0]).is_nan());
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[1.0, 3.0]), 0.0);
    }
}
