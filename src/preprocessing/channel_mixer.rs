//! Channel mixing utilities (multi-channel to mono conversion)

/// Convert interleaved multi-channel samples to mono
///
/// Each output sample is the average of one interleaved frame. A trailing
/// partial frame is dropped.
///
/// # Arguments
///
/// * `samples` - Interleaved samples (L, R, L, R, ... for stereo)
/// * `channels` - Number of interleaved channels
///
/// # Returns
///
/// Mono samples
pub fn interleaved_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(interleaved_to_mono(&samples, 1), samples);
    }

    #[test]
    fn test_stereo_average() {
        let samples = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(interleaved_to_mono(&samples, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_partial_frame_dropped() {
        let samples = vec![0.3, 0.3, 0.3, 0.9, 0.9];
        let mono = interleaved_to_mono(&samples, 3);
        assert_eq!(mono.len(), 1);
        assert!((mono[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_zero_channels() {
        assert!(interleaved_to_mono(&[0.5, 0.5], 0).is_empty());
    }
}
