//! Octave-error correction
//!
//! Tempo trackers often lock onto half or double the perceived tempo. The
//! detected tempo is multiplied by 0.25, 0.5, 1, 2 and 4, candidates outside
//! 40-240 BPM are dropped, and the rest are scored:
//!
//! | Condition                                  | Factor |
//! |--------------------------------------------|--------|
//! | within 5 BPM of the detected tempo         | base 10 (else 1) |
//! | 80 ≤ bpm ≤ 140                             | × 2.0  |
//! | 140 < bpm ≤ 180                            | × 1.8  |
//! | 180 < bpm ≤ 240                            | × 1.5  |
//! | 60 ≤ bpm < 80                              | × 1.6  |
//! | 40 ≤ bpm < 60                              | × 0.8  |
//! | half-time candidate, detected > 200        | × 1.4  |
//! | double-time candidate, detected < 70       | × 1.3  |
//!
//! The first candidate with a strictly higher score wins.

const MULTIPLIERS: [f32; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];
const MIN_BPM: f32 = 40.0;
const MAX_BPM: f32 = 240.0;

/// A scored octave candidate
#[derive(Debug, Clone, PartialEq)]
pub struct TempoCandidate {
    /// Candidate tempo in BPM
    pub bpm: f32,

    /// Multiplier applied to the detected tempo
    pub multiplier: f32,

    /// Heuristic plausibility score
    pub score: f32,
}

/// Outcome of octave correction
#[derive(Debug, Clone, PartialEq)]
pub struct OctaveDecision {
    /// Tempo before correction
    pub primary: f32,

    /// Selected tempo
    pub corrected: f32,

    /// Multiplier of the selected tempo (1.0 when the primary stands)
    pub multiplier: f32,

    /// Every in-range candidate with its score, in multiplier order
    pub candidates: Vec<TempoCandidate>,
}

fn range_factor(bpm: f32) -> f32 {
    if (80.0..=140.0).contains(&bpm) {
        2.0
    } else if bpm > 140.0 && bpm <= 180.0 {
        1.8
    } else if bpm > 180.0 && bpm <= 240.0 {
        1.5
    } else if (60.0..80.0).contains(&bpm) {
        1.6
    } else if (40.0..60.0).contains(&bpm) {
        0.8
    } else {
        1.0
    }
}

/// Score one candidate against the detected tempo
pub fn score_candidate(candidate: f32, multiplier: f32, primary: f32) -> f32 {
    let mut score = if (candidate - primary).abs() < 5.0 {
        10.0
    } else {
        1.0
    };

    score *= range_factor(candidate);

    if primary > 200.0 && multiplier == 0.5 {
        score *= 1.4;
    }
    if primary < 70.0 && multiplier == 2.0 {
        score *= 1.3;
    }

    score
}

/// Choose the most plausible octave of a detected tempo
///
/// # Arguments
///
/// * `primary` - Detected tempo in BPM
///
/// # Returns
///
/// The decision with all scored candidates. With no candidate in range the
/// primary tempo stands.
pub fn correct_octave(primary: f32) -> OctaveDecision {
    let candidates: Vec<TempoCandidate> = MULTIPLIERS
        .iter()
        .map(|&m| (primary * m, m))
        .filter(|&(bpm, _)| (MIN_BPM..=MAX_BPM).contains(&bpm))
        .map(|(bpm, multiplier)| TempoCandidate {
            bpm,
            multiplier,
            score: score_candidate(bpm, multiplier, primary),
        })
        .collect();

    let mut corrected = primary;
    let mut multiplier = 1.0;
    let mut best_score = -1.0f32;
    for c in &candidates {
        if c.score > best_score {
            best_score = c.score;
            corrected = c.bpm;
            multiplier = c.multiplier;
        }
    }

    if multiplier != 1.0 {
        log::debug!(
            "Octave correction: {:.2} -> {:.2} BPM (x{})",
            primary,
            corrected,
            multiplier
        );
    }

    OctaveDecision {
        primary,
        corrected,
        multiplier,
        candidates,
    }
}
