//! Time signature detection
//!
//! Detects the meter (4/4, 3/4 or 6/8) from the accent pattern of detected
//! beats.
//!
//! # Algorithm
//!
//! 1. Onset envelope, global tempo and onset peaks of the signal
//! 2. Interval consistency: `1 - std(intervals) / (mean(intervals) + ε)`
//! 3. Beat energy: sum of squares over a fixed window after each onset
//! 4. Energies min-max normalised, then scored per meter:
//!    - 4/4: bars of 4 whose first beat is the loudest
//!    - 3/4: bars of 3 whose first beat is the loudest
//!    - 6/8: bars of 6 where beats 1 and 4 are both above the bar mean
//! 5. A meter wins when it clearly beats the others (× 1.3 / × 1.2 margins);
//!    otherwise 4/4 with confidence 0.5
//!
//! # Example
//!
//! ```no_run
//! use trackprobe::config::TimeSignatureConfig;
//! use trackprobe::features::beat_tracking::time_signature::detect_time_signature;
//!
//! let samples = vec![0.0f32; 22050 * 30];
//! let estimate = detect_time_signature(&samples, 22050, &TimeSignatureConfig::default())?;
//! println!("{} ({:.2})", estimate.time_signature.name(), estimate.confidence);
//! # Ok::<(), trackprobe::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::config::TimeSignatureConfig;
use crate::error::AnalysisError;
use crate::features::onset::{detect_onsets, frames_to_seconds, onset_strength};
use crate::features::period::global_tempo;

const EPSILON: f32 = 1e-6;

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSignature {
    /// 4/4 time (common time)
    #[serde(rename = "4/4")]
    FourFour,
    /// 3/4 time (waltz time)
    #[serde(rename = "3/4")]
    ThreeFour,
    /// 6/8 time (compound duple)
    #[serde(rename = "6/8")]
    SixEight,
}

impl TimeSignature {
    /// Get beats per bar for this time signature
    pub fn beats_per_bar(&self) -> u32 {
        match self {
            TimeSignature::FourFour => 4,
            TimeSignature::ThreeFour => 3,
            TimeSignature::SixEight => 6,
        }
    }

    /// Get name as string (e.g., "4/4", "3/4", "6/8")
    pub fn name(&self) -> &'static str {
        match self {
            TimeSignature::FourFour => "4/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::SixEight => "6/8",
        }
    }
}

/// Why a time signature was defaulted rather than detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSignatureReason {
    /// Too few onsets to measure intervals
    InsufficientBeats,
    /// Too few onsets with a full energy window
    InsufficientData,
    /// No meter clearly outscored the others
    Ambiguous,
}

impl TimeSignatureReason {
    /// Snake-case name used in JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSignatureReason::InsufficientBeats => "insufficient_beats",
            TimeSignatureReason::InsufficientData => "insufficient_data",
            TimeSignatureReason::Ambiguous => "ambiguous",
        }
    }
}

/// Normalised accent scores per meter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterScores {
    /// Strong beat every fourth onset
    #[serde(rename = "4/4")]
    pub four_four: f32,
    /// Strong beat every third onset
    #[serde(rename = "3/4")]
    pub three_four: f32,
    /// Strong beats on onsets 1 and 4 of six
    #[serde(rename = "6/8")]
    pub six_eight: f32,
}

/// Time signature estimate
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignatureEstimate {
    /// Detected (or defaulted) time signature
    pub time_signature: TimeSignature,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Global tempo in BPM (absent when too few beats were found)
    pub bpm: Option<f32>,

    /// Accent scores (absent when too few beats were found)
    pub scores: Option<MeterScores>,

    /// Set when the result is a default rather than a detection
    pub reason: Option<TimeSignatureReason>,
}

impl TimeSignatureEstimate {
    fn fallback(confidence: f32, reason: TimeSignatureReason) -> Self {
        Self {
            time_signature: TimeSignature::FourFour,
            confidence,
            bpm: None,
            scores: None,
            reason: Some(reason),
        }
    }
}

/// Interval consistency of a sorted list of onset times
///
/// `1 - std / (mean + ε)` over the inter-onset intervals (population std).
/// Returns 0 for fewer than two onsets.
pub fn interval_consistency(onset_times: &[f32]) -> f32 {
    if onset_times.len() < 2 {
        return 0.0;
    }
    let intervals: Vec<f32> = onset_times.windows(2).map(|w| w[1] - w[0]).collect();
    let n = intervals.len() as f32;
    let mean = intervals.iter().sum::<f32>() / n;
    let variance = intervals.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / n;
    1.0 - variance.sqrt() / (mean + EPSILON)
}

/// Score accent patterns of normalised beat energies
pub fn score_accents(energies: &[f32]) -> MeterScores {
    let n = energies.len();

    let bar_start_loudest = |k: usize| -> f32 {
        let mut hits = 0usize;
        let mut i = 0;
        while i + k < n {
            let bar_max = energies[i..i + k]
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            if energies[i] == bar_max {
                hits += 1;
            }
            i += k;
        }
        hits as f32 / (n.saturating_sub(k) / k).max(1) as f32
    };

    let mut compound_hits = 0usize;
    let mut i = 0;
    while i + 6 < n {
        let bar = &energies[i..i + 6];
        let mean = bar.iter().sum::<f32>() / 6.0;
        if energies[i] > mean && energies[i + 3] > mean {
            compound_hits += 1;
        }
        i += 6;
    }

    MeterScores {
        four_four: bar_start_loudest(4),
        three_four: bar_start_loudest(3),
        six_eight: compound_hits as f32 / (n.saturating_sub(6) / 6).max(1) as f32,
    }
}

/// Pick the meter from accent scores
///
/// # Returns
///
/// `(time_signature, confidence, reason)`; confidence is
/// `score · consistency` clamped to [0, 1], or 0.5 when ambiguous
pub fn classify(
    scores: &MeterScores,
    consistency: f32,
) -> (TimeSignature, f32, Option<TimeSignatureReason>) {
    let MeterScores {
        four_four: s4,
        three_four: s3,
        six_eight: s6,
    } = *scores;

    let confident = |score: f32| (score * consistency).clamp(0.0, 1.0);

    if s4 > s3 * 1.3 && s4 > s6 * 1.2 {
        (TimeSignature::FourFour, confident(s4), None)
    } else if s3 > s4 * 1.3 && s3 > s6 * 1.2 {
        (TimeSignature::ThreeFour, confident(s3), None)
    } else if s6 > s4 * 1.2 && s6 > s3 * 1.2 {
        (TimeSignature::SixEight, confident(s6), None)
    } else {
        (
            TimeSignature::FourFour,
            0.5,
            Some(TimeSignatureReason::Ambiguous),
        )
    }
}

/// Detect time signature from mono audio
///
/// # Arguments
///
/// * `samples` - Mono audio samples (typically the first 30 s of a track)
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Beat and energy window parameters
///
/// # Returns
///
/// The estimate; too few beats yield 4/4 with confidence 0.3 and a reason
///
/// # Errors
///
/// Returns `AnalysisError` if the onset envelope or tempo cannot be computed.
pub fn detect_time_signature(
    samples: &[f32],
    sample_rate: u32,
    config: &TimeSignatureConfig,
) -> Result<TimeSignatureEstimate, AnalysisError> {
    log::debug!(
        "Detecting time signature: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    let hop_size = config.onset.hop_size;
    let envelope = onset_strength(samples, sample_rate, &config.onset)?;
    let tempo = global_tempo(&envelope, sample_rate, hop_size, &config.tempo)?;

    let onset_frames = detect_onsets(&envelope, sample_rate, hop_size);
    if onset_frames.len() < config.min_beats {
        log::debug!("Only {} onsets, defaulting to 4/4", onset_frames.len());
        return Ok(TimeSignatureEstimate::fallback(
            0.3,
            TimeSignatureReason::InsufficientBeats,
        ));
    }

    let onset_times = frames_to_seconds(&onset_frames, sample_rate, hop_size);
    let consistency = interval_consistency(&onset_times);

    let window = config.energy_window;
    let mut energies: Vec<f32> = onset_frames
        .iter()
        .take(config.max_beats)
        .map(|&frame| frame * hop_size)
        .filter(|&start| start + window < samples.len())
        .map(|start| samples[start..start + window].iter().map(|x| x * x).sum())
        .collect();

    if energies.len() < config.min_beats {
        log::debug!("Only {} beat energies, defaulting to 4/4", energies.len());
        return Ok(TimeSignatureEstimate::fallback(
            0.3,
            TimeSignatureReason::InsufficientData,
        ));
    }

    let min = energies.iter().copied().fold(f32::INFINITY, f32::min);
    let max = energies.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    for e in energies.iter_mut() {
        *e = (*e - min) / (max - min + EPSILON);
    }

    let scores = score_accents(&energies);
    let (time_signature, confidence, reason) = classify(&scores, consistency);

    log::debug!(
        "Time signature {} (confidence {:.2}, scores 4/4={:.2} 3/4={:.2} 6/8={:.2}, consistency {:.2})",
        time_signature.name(),
        confidence,
        scores.four_four,
        scores.three_four,
        scores.six_eight,
        consistency
    );

    Ok(TimeSignatureEstimate {
        time_signature,
        confidence,
        bpm: Some(tempo),
        scores: Some(scores),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(pattern: &[f32], n: usize) -> Vec<f32> {
        pattern.iter().copied().cycle().take(n).collect()
    }

    #[test]
    fn test_time_signature_names() {
        assert_eq!(TimeSignature::FourFour.name(), "4/4");
        assert_eq!(TimeSignature::ThreeFour.name(), "3/4");
        assert_eq!(TimeSignature::SixEight.name(), "6/8");
        assert_eq!(TimeSignature::SixEight.beats_per_bar(), 6);
    }

    #[test]
    fn test_four_four_accents() {
        let energies = repeat(&[1.0, 0.0, 0.0, 0.0], 48);
        let scores = score_accents(&energies);
        assert_eq!(scores.four_four, 1.0);
        assert!((scores.three_four - 7.0 / 15.0).abs() < 1e-6);
        assert_eq!(scores.six_eight, 0.0);

        let (ts, confidence, reason) = classify(&scores, 0.9);
        assert_eq!(ts, TimeSignature::FourFour);
        assert!((confidence - 0.9).abs() < 1e-6);
        assert!(reason.is_none());
    }

    #[test]
    fn test_three_four_accents() {
        let energies = repeat(&[1.0, 0.0, 0.0, 0.25, 0.2, 0.2], 48);
        let scores = score_accents(&energies);
        assert_eq!(scores.three_four, 1.0);
        assert_eq!(scores.six_eight, 0.0);
        let (ts, _, _) = classify(&scores, 1.0);
        assert_eq!(ts, TimeSignature::ThreeFour);
    }

    #[test]
    fn test_six_eight_accents() {
        let energies = repeat(&[1.0, 0.0, 0.0, 0.6, 0.7, 0.0], 48);
        let scores = score_accents(&energies);
        assert_eq!(scores.six_eight, 1.0);
        let (ts, _, _) = classify(&scores, 1.0);
        assert_eq!(ts, TimeSignature::SixEight);
    }

    #[test]
    fn test_even_accents_are_ambiguous() {
        // Equal accents every third beat also satisfy the 6/8 test
        let energies = repeat(&[1.0, 0.0, 0.0], 48);
        let (ts, confidence, reason) = classify(&score_accents(&energies), 1.0);
        assert_eq!(ts, TimeSignature::FourFour);
        assert_eq!(confidence, 0.5);
        assert_eq!(reason, Some(TimeSignatureReason::Ambiguous));
    }

    #[test]
    fn test_negative_consistency_clamps_confidence() {
        let scores = MeterScores {
            four_four: 1.0,
            three_four: 0.1,
            six_eight: 0.1,
        };
        let (_, confidence, _) = classify(&scores, -0.4);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_interval_consistency() {
        let steady: Vec<f32> = (0..10).map(|i| i as f32 * 0.5).collect();
        assert!((interval_consistency(&steady) - 1.0).abs() < 1e-4);
        assert_eq!(interval_consistency(&[1.0]), 0.0);
        let uneven = [0.0, 0.1, 1.0, 1.1, 2.0];
        assert!(interval_consistency(&uneven) < 0.5);
    }

    #[test]
    fn test_silence_has_insufficient_beats() {
        let samples = vec![0.0f32; 22050 * 5];
        let estimate =
            detect_time_signature(&samples, 22050, &TimeSignatureConfig::default()).unwrap();
        assert_eq!(estimate.time_signature, TimeSignature::FourFour);
        assert_eq!(estimate.confidence, 0.3);
        assert_eq!(estimate.reason, Some(TimeSignatureReason::InsufficientBeats));
        assert!(estimate.scores.is_none());
    }

    /// Decaying noise bursts every 10752 samples after a one second lead-in
    fn burst_train(n_beats: usize) -> Vec<f32> {
        let mut samples = vec![0.0f32; 22050 + 10752 * n_beats];
        let mut state = 7u32;
        for beat in 0..n_beats {
            let start = 22050 + beat * 10752;
            for i in 0..2205 {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let noise = (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                samples[start + i] = noise * (-(i as f32) / 400.0).exp() * 0.8;
            }
        }
        samples
    }

    #[test]
    fn test_short_energy_windows_are_insufficient_data() {
        let samples = burst_train(20);
        // No onset leaves a full energy window before the end of the clip
        let config = TimeSignatureConfig {
            energy_window: samples.len(),
            ..TimeSignatureConfig::default()
        };
        let estimate = detect_time_signature(&samples, 22050, &config).unwrap();
        assert_eq!(estimate.time_signature, TimeSignature::FourFour);
        assert_eq!(estimate.confidence, 0.3);
        assert_eq!(estimate.reason, Some(TimeSignatureReason::InsufficientData));
        assert!(estimate.scores.is_none());
    }

    #[test]
    fn test_few_beat_energies_are_insufficient_data() {
        let config = TimeSignatureConfig {
            max_beats: 5,
            ..TimeSignatureConfig::default()
        };
        let estimate = detect_time_signature(&burst_train(20), 22050, &config).unwrap();
        assert_eq!(estimate.reason, Some(TimeSignatureReason::InsufficientData));

        let full = detect_time_signature(&burst_train(20), 22050, &TimeSignatureConfig::default())
            .unwrap();
        assert_ne!(full.reason, Some(TimeSignatureReason::InsufficientData));
        assert_ne!(full.reason, Some(TimeSignatureReason::InsufficientBeats));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(TimeSignatureReason::Ambiguous.as_str(), "ambiguous");
        assert_eq!(
            serde_json::to_string(&TimeSignatureReason::InsufficientData).unwrap(),
            "\"insufficient_data\""
        );
    }
}
