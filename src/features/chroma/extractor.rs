//! Chroma vector extraction
//!
//! A long-frame STFT is folded onto a log-frequency axis with
//! `bins_per_octave` bins per octave starting at C1, then every pitch class
//! collects the log bins centred on its semitones. With 36 bins per octave each
//! semitone owns three log bins (its centre and one on either side).
//!
//! Every FFT bin maps to log bin `round(bins_per_octave · log2(f / fmin))`.
//! A log bin takes the peak magnitude of its FFT bins, so a sinusoid scores
//! the same whatever the width of the log bin it falls into.

use super::normalization::normalize_max;
use crate::config::ChromaConfig;
use crate::error::AnalysisError;
use crate::features::spectrum::{bin_frequency, stft_magnitude};

/// Log bin and pitch class of every FFT bin (`None` when outside the range)
fn bin_mapping(
    frame_size: usize,
    sample_rate: u32,
    config: &ChromaConfig,
) -> Vec<Option<(usize, usize)>> {
    let n_log_bins = config.bins_per_octave * config.n_octaves;
    let bins_per_semitone = config.bins_per_octave as f32 / 12.0;

    (0..frame_size / 2 + 1)
        .map(|k| {
            let f = bin_frequency(k, frame_size, sample_rate);
            if f <= 0.0 {
                return None;
            }
            let log_bin = (config.bins_per_octave as f32 * (f / config.fmin).log2()).round();
            if log_bin < 0.0 || log_bin as usize >= n_log_bins {
                return None;
            }
            let log_bin = log_bin as usize;
            let pitch_class = (log_bin as f32 / bins_per_semitone).round() as usize % 12;
            Some((log_bin, pitch_class))
        })
        .collect()
}

/// Extract chroma vectors from audio samples
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Frame, hop and log-frequency parameters
///
/// # Returns
///
/// One 12-element chroma vector per frame (C, C#, ..., B), each scaled so its
/// largest element is 1. Silent frames stay zero.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate, invalid STFT
/// sizes or a `bins_per_octave` that is not a multiple of 12.
pub fn extract_chroma(
    samples: &[f32],
    sample_rate: u32,
    config: &ChromaConfig,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    log::debug!(
        "Extracting chroma: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
    }
    if config.bins_per_octave == 0 || config.bins_per_octave % 12 != 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "bins_per_octave must be a positive multiple of 12, got {}",
            config.bins_per_octave
        )));
    }

    let spectrogram = stft_magnitude(samples, config.frame_size, config.hop_size)?;
    let mapping = bin_mapping(config.frame_size, sample_rate, config);

    let n_log_bins = config.bins_per_octave * config.n_octaves;
    let mut log_pitch = vec![None; n_log_bins];
    for &(log_bin, pitch_class) in mapping.iter().flatten() {
        log_pitch[log_bin] = Some(pitch_class);
    }

    let mut chroma = Vec::with_capacity(spectrogram.len());
    let mut log_spectrum = vec![0.0f32; n_log_bins];
    for frame in &spectrogram {
        log_spectrum.fill(0.0);
        for (mag, m) in frame.iter().zip(mapping.iter()) {
            if let Some((log_bin, _)) = m {
                log_spectrum[*log_bin] = log_spectrum[*log_bin].max(*mag);
            }
        }

        let mut pitch = vec![0.0f32; 12];
        for (value, pitch_class) in log_spectrum.iter().zip(log_pitch.iter()) {
            if let Some(pc) = pitch_class {
                pitch[*pc] += value;
            }
        }
        chroma.push(normalize_max(&pitch));
    }

    log::debug!("Extracted {} chroma frames", chroma.len());

    Ok(chroma)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        (0..(sample_rate as f32 * seconds) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn argmax(v: &[f32]) -> usize {
        v.iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_a440_maps_to_a() {
        let samples = sine(440.0, 22050, 2.0);
        let chroma = extract_chroma(&samples, 22050, &ChromaConfig::default()).unwrap();
        assert_eq!(chroma.len(), 1 + samples.len() / 2048);
        let mid = &chroma[chroma.len() / 2];
        assert_eq!(mid.len(), 12);
        assert_eq!(argmax(mid), 9);
        assert!((mid[9] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_middle_c_maps_to_c() {
        let samples = sine(261.63, 22050, 2.0);
        let chroma = extract_chroma(&samples, 22050, &ChromaConfig::default()).unwrap();
        assert_eq!(argmax(&chroma[chroma.len() / 2]), 0);
    }

    #[test]
    fn test_silent_frames_stay_zero() {
        let chroma = extract_chroma(&vec![0.0; 22050], 22050, &ChromaConfig::default()).unwrap();
        assert!(chroma.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mapping_folds_three_bins_per_semitone() {
        let config = ChromaConfig::default();
        let mapping = bin_mapping(config.frame_size, 22050, &config);
        // Bins near A4 (440 Hz) all fold into pitch class 9
        let a4_bin = (440.0 * config.frame_size as f32 / 22050.0).round() as usize;
        assert_eq!(mapping[a4_bin].map(|(_, pc)| pc), Some(9));
        // DC is excluded
        assert!(mapping[0].is_none());
    }

    #[test]
    fn test_invalid_config() {
        let config = ChromaConfig {
            bins_per_octave: 20,
            ..ChromaConfig::default()
        };
        assert!(extract_chroma(&[0.0; 8192], 22050, &config).is_err());
        assert!(extract_chroma(&[0.0; 8192], 0, &ChromaConfig::default()).is_err());
    }
}
