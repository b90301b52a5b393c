//! Short-time Fourier transform
//!
//! Frames are centred on `t * hop_size` (the signal is zero-padded by half a
//! frame on both sides) and weighted with a periodic Hann window.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::AnalysisError;

/// Periodic Hann window of the given length
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| {
            let t = 2.0 * std::f32::consts::PI * n as f32 / size as f32;
            0.5 - 0.5 * t.cos()
        })
        .collect()
}

/// Centre frequency of an FFT bin in Hz
pub fn bin_frequency(bin: usize, frame_size: usize, sample_rate: u32) -> f32 {
    bin as f32 * sample_rate as f32 / frame_size as f32
}

/// Compute the magnitude spectrogram of a mono signal
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `frame_size` - FFT size
/// * `hop_size` - Hop between frame centres
///
/// # Returns
///
/// `1 + samples.len() / hop_size` frames of `frame_size / 2 + 1` magnitudes
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for zero frame or hop sizes.
pub fn stft_magnitude(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    if frame_size == 0 {
        return Err(AnalysisError::InvalidInput("Frame size must be > 0".to_string()));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput("Hop size must be > 0".to_string()));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let n_frames = 1 + samples.len() / hop_size;
    let n_bins = frame_size / 2 + 1;
    let half = frame_size / 2;
    let window = hann_window(frame_size);

    log::debug!(
        "STFT: {} samples, frame={}, hop={}, {} frames",
        samples.len(),
        frame_size,
        hop_size,
        n_frames
    );

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];
    let mut frames = Vec::with_capacity(n_frames);

    for t in 0..n_frames {
        let centre = t * hop_size;
        for (k, slot) in buffer.iter_mut().enumerate() {
            let idx = (centre + k).checked_sub(half);
            let x = match idx {
                Some(i) if i < samples.len() => samples[i],
                _ => 0.0,
            };
            *slot = Complex::new(x * window[k], 0.0);
        }

        fft.process(&mut buffer);
        frames.push(buffer[..n_bins].iter().map(|c| c.norm()).collect());
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_frame_count_and_bins() {
        let samples = vec![0.0f32; 22050];
        let frames = stft_magnitude(&samples, 2048, 512).unwrap();
        assert_eq!(frames.len(), 1 + 22050 / 512);
        assert_eq!(frames[0].len(), 1025);
    }

    #[test]
    fn test_sine_peak_bin() {
        let sr = 22050u32;
        let freq = 1000.0f32;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let frames = stft_magnitude(&samples, 2048, 512).unwrap();
        let mid = &frames[frames.len() / 2];
        let peak_bin = mid
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let peak_freq = bin_frequency(peak_bin, 2048, sr);
        assert!((peak_freq - freq).abs() < 15.0, "peak at {} Hz", peak_freq);
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(stft_magnitude(&[0.0; 100], 0, 512).is_err());
        assert!(stft_magnitude(&[0.0; 100], 2048, 0).is_err());
        assert!(stft_magnitude(&[], 2048, 512).unwrap().is_empty());
    }
}
