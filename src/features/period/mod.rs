//! Tempo estimation
//!
//! Turn an onset envelope into a tempo:
//! - Local autocorrelation tempogram
//! - Prior-weighted lag selection per frame (or on the averaged tempogram)
//! - Histogram vote across frames
//! - Octave-error correction

pub mod autocorrelation;
pub mod octave;
pub mod tempogram;

pub use autocorrelation::autocorrelation_tempogram;
pub use octave::{correct_octave, OctaveDecision, TempoCandidate};
pub use tempogram::{dominant_tempo, frame_tempos, global_tempo, tempo_frequencies};
