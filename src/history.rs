//! Stability and decay analysis over ordered state sequences.
//!
//! Operates on caller-supplied slices of [`TriadicVector`]; no timestamps
//! are required here. Both measures reduce the sequence to its per-step
//! strength and analyze the resulting scalar series.

use crate::error::{Result, TriadError};
use crate::metrics::TriadicVector;

/// Decay rate of the variance-to-stability mapping: stability is
/// `exp(-variance * STABILITY_DECAY_RATE)`
pub const STABILITY_DECAY_RATE: f64 = 5.0;

/// Minimum samples for a trend estimate
const MIN_TREND_SAMPLES: usize = 3;

/// Stability of a state sequence in [0, 1].
///
/// Inverse of the variance of per-step strength, mapped through
/// `exp(-variance * STABILITY_DECAY_RATE)`: a constant sequence yields
/// exactly 1.0 and high variance trends toward 0. Fewer than 2 samples
/// yields 1.0 (insufficient data, assume stable).
pub fn stability(history: &[TriadicVector]) -> f64 {
    if history.len() < 2 {
        return 1.0;
    }

    let strengths = strength_series(history);
    (-variance(&strengths) * STABILITY_DECAY_RATE).exp()
}

/// Stability scored over only the most recent `window` samples.
///
/// `window` must be at least 1.
pub fn stability_windowed(history: &[TriadicVector], window: usize) -> Result<f64> {
    if window == 0 {
        return Err(TriadError::InvalidConfig(
            "stability window must be at least 1".to_string(),
        ));
    }

    let start = history.len().saturating_sub(window);
    Ok(stability(&history[start..]))
}

/// Detect a statistically consistent downward strength trend.
///
/// Fits a least-squares line to the strength series over sample index and
/// reports decay iff the slope is below `-threshold`. Fewer than 3 samples
/// yields `false`. `threshold` must be finite and non-negative.
pub fn decay_detected(history: &[TriadicVector], threshold: f64) -> Result<bool> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(TriadError::InvalidConfig(format!(
            "decay threshold must be finite and non-negative, got {}",
            threshold
        )));
    }

    if history.len() < MIN_TREND_SAMPLES {
        return Ok(false);
    }

    let strengths = strength_series(history);
    Ok(slope(&strengths) < -threshold)
}

/// Per-step strength of a state sequence
pub(crate) fn strength_series(history: &[TriadicVector]) -> Vec<f64> {
    history.iter().map(|v| v.strength()).collect()
}

/// Population variance
pub(crate) fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Least-squares slope of a series over its sample index
pub(crate) fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n_f;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (i, v) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        cov += dx * (v - y_mean);
        var_x += dx * dx;
    }

    if var_x < 1e-10 {
        return 0.0;
    }

    cov / var_x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn constant_history(n: usize) -> Vec<TriadicVector> {
        vec![TriadicVector::new(1.0, 1.0, 1.0); n]
    }

    #[test]
    fn test_stability_constant_sequence() {
        assert!(approx_eq(stability(&constant_history(10)), 1.0, 1e-12));
    }

    #[test]
    fn test_stability_insufficient_data() {
        assert_eq!(stability(&[]), 1.0);
        assert_eq!(stability(&[TriadicVector::new(1.0, 2.0, 3.0)]), 1.0);
    }

    #[test]
    fn test_stability_drops_with_variance() {
        let mut noisy = Vec::new();
        for i in 0..20 {
            let v = if i % 2 == 0 { 0.1 } else { 5.0 };
            noisy.push(TriadicVector::new(v, v, v));
        }
        let s = stability(&noisy);
        assert!(s < 0.5);
    }

    #[test]
    fn test_stability_idempotent() {
        // Same input twice yields identical results: no hidden state
        let history: Vec<TriadicVector> = (0..15)
            .map(|i| TriadicVector::new(1.0 + i as f64 * 0.1, 1.0, 1.0))
            .collect();
        assert_eq!(stability(&history), stability(&history));
    }

    #[test]
    fn test_stability_windowed() {
        // Early chaos, recent calm: windowed score should be higher
        let mut history = Vec::new();
        for i in 0..10 {
            let v = if i % 2 == 0 { 0.1 } else { 5.0 };
            history.push(TriadicVector::new(v, v, v));
        }
        history.extend(constant_history(10));

        let full = stability(&history);
        let recent = stability_windowed(&history, 5).unwrap();
        assert!(recent > full);
        assert!(approx_eq(recent, 1.0, 1e-12));
    }

    #[test]
    fn test_stability_windowed_rejects_zero() {
        let err = stability_windowed(&constant_history(5), 0).unwrap_err();
        assert!(matches!(err, TriadError::InvalidConfig(_)));
    }

    #[test]
    fn test_decay_detected_on_falling_strength() {
        // Strength ramps down steadily
        let history: Vec<TriadicVector> = (0..10)
            .map(|i| {
                let k = 2.0 - i as f64 * 0.2;
                TriadicVector::new(k, k, k)
            })
            .collect();

        assert!(decay_detected(&history, 0.01).unwrap());
    }

    #[test]
    fn test_decay_not_detected_on_constant() {
        assert!(!decay_detected(&constant_history(10), 0.01).unwrap());
    }

    #[test]
    fn test_decay_not_detected_on_rising() {
        let history: Vec<TriadicVector> = (0..10)
            .map(|i| {
                let k = 0.5 + i as f64 * 0.2;
                TriadicVector::new(k, k, k)
            })
            .collect();

        assert!(!decay_detected(&history, 0.01).unwrap());
    }

    #[test]
    fn test_decay_insufficient_history() {
        assert!(!decay_detected(&constant_history(2), 0.01).unwrap());
    }

    #[test]
    fn test_decay_rejects_bad_threshold() {
        let history = constant_history(5);
        assert!(decay_detected(&history, -0.1).is_err());
        assert!(decay_detected(&history, f64::NAN).is_err());
    }

    #[test]
    fn test_slope_linear() {
        let values: Vec<f64> = (0..10).map(|i| 2.0 * i as f64).collect();
        assert!(approx_eq(slope(&values), 2.0, 1e-9));
    }

    #[test]
    fn test_variance_known_value() {
        // Var([1..5]) = 2
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx_eq(variance(&values), 2.0, 1e-9));
    }
}
