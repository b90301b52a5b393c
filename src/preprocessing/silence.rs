//! Silence detection utilities

/// Peak level in dBFS (`-inf` for an all-zero or empty buffer)
pub fn peak_db(samples: &[f32]) -> f32 {
    let peak = samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    if peak <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * peak.log10()
    }
}

/// True when no sample reaches `threshold_db`
pub fn is_silent(samples: &[f32], threshold_db: f32) -> bool {
    peak_db(samples) < threshold_db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_db_full_scale() {
        assert!((peak_db(&[0.0, -1.0, 0.5]) - 0.0).abs() < 1e-6);
        assert!((peak_db(&[0.1]) + 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_silence() {
        assert!(is_silent(&[0.0; 1000], -80.0));
        assert!(is_silent(&[], -80.0));
        assert!(is_silent(&[1e-6; 10], -80.0));
        assert!(!is_silent(&[0.01; 10], -80.0));
    }
}
