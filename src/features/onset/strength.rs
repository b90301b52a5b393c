//! Onset strength envelope
//!
//! Spectral-flux novelty on a log-power mel spectrogram.
//!
//! # Algorithm
//!
//! 1. Magnitude STFT (centred frames, Hann window)
//! 2. Power spectrum projected onto a triangular mel filterbank
//! 3. Power converted to dB and floored at `max - top_db`
//! 4. Positive first-order difference per band
//! 5. Bands aggregated per frame (median by default)
//!
//! The envelope has one value per STFT frame; frame 0 is always 0.
//!
//! # Reference
//!
//! Böck, S., & Widmer, G. (2013). Maximum Filter Vibrato Suppression for Onset Detection.
//! *Proceedings of the International Conference on Digital Audio Effects*.

use crate::config::{Aggregate, OnsetConfig};
use crate::error::AnalysisError;
use crate::features::spectrum::{bin_frequency, stft_magnitude};

/// Power floor before the dB conversion
const AMIN: f32 = 1e-10;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Build a triangular mel filterbank
///
/// # Arguments
///
/// * `n_mels` - Number of bands
/// * `frame_size` - FFT size the filterbank is applied to
/// * `sample_rate` - Sample rate in Hz
/// * `fmin` - Lower edge of the first band in Hz
/// * `fmax` - Upper edge of the last band in Hz
///
/// # Returns
///
/// `n_mels` rows of `frame_size / 2 + 1` weights, each row area-normalised
pub fn mel_filterbank(
    n_mels: usize,
    frame_size: usize,
    sample_rate: u32,
    fmin: f32,
    fmax: f32,
) -> Vec<Vec<f32>> {
    let n_bins = frame_size / 2 + 1;
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);

    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (lower, centre, upper) = (edges[m], edges[m + 1], edges[m + 2]);
            let norm = 2.0 / (upper - lower).max(f32::EPSILON);
            (0..n_bins)
                .map(|k| {
                    let f = bin_frequency(k, frame_size, sample_rate);
                    let rising = (f - lower) / (centre - lower).max(f32::EPSILON);
                    let falling = (upper - f) / (upper - centre).max(f32::EPSILON);
                    rising.min(falling).max(0.0) * norm
                })
                .collect()
        })
        .collect()
}

/// Median of a slice (average of the two middle values for even lengths)
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) * 0.5
    } else {
        values[mid]
    }
}

/// Compute the onset strength envelope of a mono signal
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - STFT, mel and aggregation parameters
///
/// # Returns
///
/// One non-negative onset strength value per STFT frame
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or invalid
/// STFT sizes.
pub fn onset_strength(
    samples: &[f32],
    sample_rate: u32,
    config: &OnsetConfig,
) -> Result<Vec<f32>, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
    }

    let spectrogram = stft_magnitude(samples, config.frame_size, config.hop_size)?;
    if spectrogram.is_empty() {
        return Ok(Vec::new());
    }

    let nyquist = sample_rate as f32 / 2.0;
    let fmax = config.fmax.unwrap_or(nyquist).min(nyquist);
    let filterbank = mel_filterbank(
        config.n_mels,
        config.frame_size,
        sample_rate,
        config.fmin,
        fmax,
    );

    // Log-power mel spectrogram
    let mut mel_db: Vec<Vec<f32>> = spectrogram
        .iter()
        .map(|frame| {
            filterbank
                .iter()
                .map(|weights| {
                    let power: f32 = weights
                        .iter()
                        .zip(frame.iter())
                        .map(|(w, m)| w * m * m)
                        .sum();
                    10.0 * power.max(AMIN).log10()
                })
                .collect()
        })
        .collect();

    let max_db = mel_db
        .iter()
        .flat_map(|frame| frame.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = max_db - config.top_db;
    for frame in mel_db.iter_mut() {
        for v in frame.iter_mut() {
            *v = v.max(floor);
        }
    }

    let mut envelope = Vec::with_capacity(mel_db.len());
    envelope.push(0.0);
    let mut diffs = vec![0.0f32; config.n_mels];
    for t in 1..mel_db.len() {
        for (m, d) in diffs.iter_mut().enumerate() {
            *d = (mel_db[t][m] - mel_db[t - 1][m]).max(0.0);
        }
        let value = match config.aggregate {
            Aggregate::Median => median(&mut diffs),
            Aggregate::Mean => diffs.iter().sum::<f32>() / diffs.len().max(1) as f32,
        };
        envelope.push(value);
    }

    log::debug!(
        "Onset strength: {} frames, max={:.3}",
        envelope.len(),
        envelope.iter().copied().fold(0.0f32, f32::max)
    );

    Ok(envelope)
}
