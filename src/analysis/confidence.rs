//! Confidence scoring
//!
//! Both scores are bounded to [0, 1] before they reach a report.

/// BPM confidence from the spread of the onset envelope
///
/// A strongly pulsed signal has a spiky envelope with a large standard
/// deviation. The score is `min(1, std / 10)`, or 0.5 when the envelope is
/// flat (population standard deviation of 0).
pub fn bpm_confidence(onset_envelope: &[f32]) -> f32 {
    if onset_envelope.is_empty() {
        return 0.5;
    }
    let n = onset_envelope.len() as f64;
    let mean = onset_envelope.iter().map(|&x| x as f64).sum::<f64>() / n;
    let variance = onset_envelope
        .iter()
        .map(|&x| (x as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = variance.sqrt() as f32;

    let confidence = if std > 0.0 { (std / 10.0).min(1.0) } else { 0.5 };
    confidence.clamp(0.0, 1.0)
}

/// Key confidence from the best template correlation
pub fn key_confidence(correlation: f32) -> f32 {
    if correlation.is_nan() {
        return 0.0;
    }
    correlation.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_envelope() {
        assert_eq!(bpm_confidence(&[3.0; 100]), 0.5);
        assert_eq!(bpm_confidence(&[]), 0.5);
    }

    #[test]
    fn test_spread_scales_confidence() {
        // Alternating 0 / 4: std = 2
        let env: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.0 } else { 4.0 }).collect();
        assert!((bpm_confidence(&env) - 0.2).abs() < 1e-6);

        // Alternating 0 / 40: std = 20, capped at 1
        let env: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.0 } else { 40.0 }).collect();
        assert_eq!(bpm_confidence(&env), 1.0);
    }

    #[test]
    fn test_key_confidence_bounds() {
        assert_eq!(key_confidence(-0.3), 0.0);
        assert_eq!(key_confidence(0.75), 0.75);
        assert_eq!(key_confidence(1.2), 1.0);
        assert_eq!(key_confidence(f32::NAN), 0.0);
    }
}
