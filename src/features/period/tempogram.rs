//! Tempo selection from the autocorrelation tempogram
//!
//! Each lag of the tempogram is scored as `ln(1 + 10⁶ · ac) + prior`, where the
//! prior is a log-normal bump around `start_bpm`:
//!
//! ```text
//! prior(bpm) = -0.5 * ((log2(bpm) - log2(start_bpm)) / std_bpm)²
//! ```
//!
//! Lags whose tempo is at or above `max_tempo` (and lag 0) are never chosen.
//! Per-frame winners are folded into a single track tempo with a histogram.

use super::autocorrelation::autocorrelation_tempogram;
use crate::config::TempoConfig;
use crate::error::AnalysisError;

/// Window length in frames covering `ac_size` seconds
pub fn tempogram_window(ac_size: f32, sample_rate: u32, hop_size: usize) -> usize {
    ((ac_size * sample_rate as f32) as usize / hop_size.max(1)).max(1)
}

/// Tempo in BPM of each autocorrelation lag
///
/// Lag 0 maps to `f32::INFINITY`.
pub fn tempo_frequencies(n_lags: usize, sample_rate: u32, hop_size: usize) -> Vec<f32> {
    (0..n_lags)
        .map(|lag| {
            if lag == 0 {
                f32::INFINITY
            } else {
                60.0 * sample_rate as f32 / (hop_size as f32 * lag as f32)
            }
        })
        .collect()
}

/// Log-normal tempo prior per lag (`-inf` for disallowed lags)
fn log_prior(bpms: &[f32], config: &TempoConfig) -> Vec<f32> {
    let centre = config.start_bpm.log2();
    bpms.iter()
        .map(|&bpm| {
            if !bpm.is_finite() || bpm >= config.max_tempo {
                f32::NEG_INFINITY
            } else {
                let z = (bpm.log2() - centre) / config.std_bpm;
                -0.5 * z * z
            }
        })
        .collect()
}

/// Index of the best-scoring lag (first on ties)
fn best_lag(acf: &[f32], prior: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (lag, (&ac, &p)) in acf.iter().zip(prior.iter()).enumerate() {
        if p == f32::NEG_INFINITY {
            continue;
        }
        let score = (1e6 * ac.max(0.0)).ln_1p() + p;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }
    best.map(|(lag, _)| lag)
}

fn validate(sample_rate: u32, hop_size: usize) -> Result<(), AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Sample rate must be > 0".to_string()));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput("Hop size must be > 0".to_string()));
    }
    Ok(())
}

/// Estimate the tempo of every envelope frame
///
/// # Arguments
///
/// * `envelope` - Onset strength envelope
/// * `sample_rate` - Sample rate the envelope was computed at
/// * `hop_size` - Hop between envelope frames
/// * `config` - Prior and window parameters
///
/// # Returns
///
/// One tempo in BPM per envelope frame
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or hop size.
pub fn frame_tempos(
    envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    config: &TempoConfig,
) -> Result<Vec<f32>, AnalysisError> {
    validate(sample_rate, hop_size)?;

    let win_length = tempogram_window(config.ac_size, sample_rate, hop_size);
    let tempogram = autocorrelation_tempogram(envelope, win_length)?;
    let bpms = tempo_frequencies(win_length, sample_rate, hop_size);
    let prior = log_prior(&bpms, config);

    // Without any admissible lag there is nothing to score
    let fallback = config.start_bpm;
    let tempos: Vec<f32> = tempogram
        .iter()
        .map(|acf| best_lag(acf, &prior).map_or(fallback, |lag| bpms[lag]))
        .collect();

    log::debug!(
        "Frame tempos: {} frames, window {} frames",
        tempos.len(),
        win_length
    );

    Ok(tempos)
}

/// Estimate one tempo from the time-averaged tempogram
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or hop size and
/// `AnalysisError::ProcessingError` for an empty envelope.
pub fn global_tempo(
    envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    config: &TempoConfig,
) -> Result<f32, AnalysisError> {
    validate(sample_rate, hop_size)?;
    if envelope.is_empty() {
        return Err(AnalysisError::ProcessingError(
            "Empty onset envelope".to_string(),
        ));
    }

    let win_length = tempogram_window(config.ac_size, sample_rate, hop_size);
    let tempogram = autocorrelation_tempogram(envelope, win_length)?;

    let mut mean = vec![0.0f32; win_length];
    for row in &tempogram {
        for (m, &v) in mean.iter_mut().zip(row.iter()) {
            *m += v;
        }
    }
    let n = tempogram.len() as f32;
    for m in mean.iter_mut() {
        *m /= n;
    }

    let bpms = tempo_frequencies(win_length, sample_rate, hop_size);
    let prior = log_prior(&bpms, config);
    let tempo = best_lag(&mean, &prior).map_or(config.start_bpm, |lag| bpms[lag]);

    log::debug!("Global tempo: {:.2} BPM", tempo);

    Ok(tempo)
}

/// Fold per-frame tempi into the most common tempo
///
/// Frame tempi are binned into `histogram_bins` equal bins over
/// `[histogram_min_bpm, histogram_max_bpm]` (upper edge inclusive) and the centre
/// of the fullest bin is returned, the first bin winning ties. A single frame is
/// returned as is. When no frame falls inside the range every bin is empty and
/// the lowest bin centre wins (42 BPM with the default histogram).
///
/// # Returns
///
/// `None` for an empty input
pub fn dominant_tempo(tempos: &[f32], config: &TempoConfig) -> Option<f32> {
    match tempos.len() {
        0 => return None,
        1 => return Some(tempos[0]),
        _ => {}
    }

    let lo = config.histogram_min_bpm;
    let hi = config.histogram_max_bpm;
    let n_bins = config.histogram_bins.max(1);
    let width = (hi - lo) / n_bins as f32;

    let mut counts = vec![0usize; n_bins];
    for &t in tempos {
        if t >= lo && t <= hi {
            let bin = (((t - lo) / width) as usize).min(n_bins - 1);
            counts[bin] += 1;
        }
    }

    let mut best_bin = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best_bin] {
            best_bin = i;
        }
    }

    if counts[best_bin] == 0 {
        log::warn!(
            "No frame tempo within [{}, {}] BPM, using the lowest bin",
            lo,
            hi
        );
    }

    Some(lo + width * (best_bin as f32 + 0.5))
}
