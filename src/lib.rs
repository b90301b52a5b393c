//! # trackprobe
//!
//! Audio analysis for a music library: tempo (with octave-error correction),
//! musical key (Krumhansl-Schmuckler), time signature, and the batch and
//! database plumbing that feeds results to a companion music player.
//!
//! ## Features
//!
//! - **BPM Detection**: mel spectral-flux onset envelope, autocorrelation
//!   tempogram with a log-normal tempo prior, histogram vote across frames and
//!   genre-aware octave correction
//! - **Key Detection**: log-frequency chroma correlated against 24 rotated
//!   Krumhansl-Schmuckler profiles
//! - **Time Signature**: accent patterns of onset energies (4/4, 3/4, 6/8)
//! - **Batch**: folder scanning, parallel analysis with per-file timeouts,
//!   progress events and checkpoints
//! - **Library**: schema migrations and result write-back for the player's
//!   SQLite database
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use trackprobe::{analyze_file, AnalysisConfig, TrackReport};
//!
//! let result = analyze_file(Path::new("song.mp3"), &AnalysisConfig::default())?;
//! println!("BPM: {} (confidence: {:.2})", result.bpm, result.bpm_confidence);
//! println!("Key: {} ({})", result.key.name(), result.key.camelot());
//! println!("{}", serde_json::to_string(&TrackReport::from(&result)).unwrap());
//! # Ok::<(), trackprobe::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Decode → Mono/Resample → Onset Envelope → Tempogram → Tempo → Octave Correction
//!                        → Chroma → Key
//!                        → Onsets → Accent Energies → Time Signature
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod library;
pub mod preprocessing;

use std::path::Path;
use std::time::Instant;

// Re-export main types
pub use analysis::result::{
    AnalysisMetadata, AnalysisResult, FileReport, Key, Mode, TimeSignatureReport, TrackReport,
};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use features::beat_tracking::{TimeSignature, TimeSignatureEstimate};

use analysis::confidence::{bpm_confidence, key_confidence};
use features::beat_tracking::detect_time_signature;
use features::chroma::{extract_chroma, mean_chroma};
use features::key::{detect_key, KeyTemplates};
use features::onset::onset_strength;
use features::period::{correct_octave, dominant_tempo, frame_tempos};
use io::{decode_audio, DecodeOptions};
use preprocessing::silence::is_silent;

/// Main analysis function
///
/// Estimates tempo and key of mono audio.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (22050 for the reference pipeline)
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `AnalysisResult` with whole BPM, raw tempo, key and confidences
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for empty or silent input or a zero
/// sample rate, `AnalysisError::NumericalError` for NaN or infinite samples,
/// and propagates processing errors of the feature extractors.
///
/// # Example
///
/// ```no_run
/// use trackprobe::{analyze_audio, AnalysisConfig};
///
/// let samples = vec![0.0f32; 22050 * 30];
/// let result = analyze_audio(&samples, 22050, &AnalysisConfig::default())?;
/// # Ok::<(), trackprobe::AnalysisError>(())
/// ```
pub fn analyze_audio(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let start_time = Instant::now();

    log::debug!(
        "Starting audio analysis: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
    }

    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
    }

    if let Some(index) = samples.iter().position(|x| !x.is_finite()) {
        return Err(AnalysisError::NumericalError(format!(
            "Non-finite sample at index {}",
            index
        )));
    }

    if is_silent(samples, config.min_amplitude_db) {
        return Err(AnalysisError::InvalidInput("Audio is entirely silent".to_string()));
    }

    // Tempo
    let envelope = onset_strength(samples, sample_rate, &config.onset)?;
    let tempos = frame_tempos(&envelope, sample_rate, config.onset.hop_size, &config.tempo)?;
    let primary = dominant_tempo(&tempos, &config.tempo).ok_or_else(|| {
        AnalysisError::ProcessingError("No tempo estimate for onset envelope".to_string())
    })?;
    let octave = correct_octave(primary);

    log::debug!(
        "Tempo: primary {:.2} BPM, corrected {:.2} BPM",
        primary,
        octave.corrected
    );

    // Key
    let chroma = extract_chroma(samples, sample_rate, &config.chroma)?;
    let profile = mean_chroma(&chroma);
    let key_result = detect_key(&profile, &KeyTemplates::new())?;

    let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    log::debug!(
        "Analysis complete in {:.1} ms: {} BPM, key {}",
        processing_time_ms,
        octave.corrected.round(),
        key_result.key.name()
    );

    Ok(AnalysisResult {
        bpm: octave.corrected.round().max(0.0) as u32,
        raw_bpm: primary,
        bpm_confidence: bpm_confidence(&envelope),
        key: key_result.key,
        key_confidence: key_confidence(key_result.correlation),
        metadata: AnalysisMetadata {
            duration_seconds: samples.len() as f32 / sample_rate as f32,
            sample_rate,
            processing_time_ms,
            onset_frames: envelope.len(),
            octave_multiplier: octave.multiplier,
        },
    })
}

/// Decode a file and analyse its tempo and key
///
/// # Errors
///
/// Returns decoding errors from [`io::decode_audio`] and analysis errors from
/// [`analyze_audio`].
pub fn analyze_file(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let audio = decode_audio(
        path,
        &DecodeOptions {
            target_sample_rate: Some(config.sample_rate),
            max_duration_secs: None,
        },
    )?;
    analyze_audio(&audio.samples, audio.sample_rate, config)
}

/// Decode the opening of a file and detect its time signature
///
/// Only the first `time_signature.max_duration_secs` seconds are decoded.
///
/// # Errors
///
/// Returns decoding errors and onset/tempo processing errors.
pub fn analyze_time_signature_file(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<TimeSignatureEstimate, AnalysisError> {
    let audio = decode_audio(
        path,
        &DecodeOptions {
            target_sample_rate: Some(config.sample_rate),
            max_duration_secs: Some(config.time_signature.max_duration_secs),
        },
    )?;
    detect_time_signature(&audio.samples, audio.sample_rate, &config.time_signature)
}
