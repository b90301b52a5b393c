//! Onset detection
//!
//! - Onset strength envelope (mel spectral flux)
//! - Peak picking on the envelope

pub mod peaks;
pub mod strength;

pub use peaks::{detect_onsets, frames_to_seconds};
pub use strength::{mel_filterbank, onset_strength};
