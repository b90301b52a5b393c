//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Short-time Fourier transform
//! - Onset strength and onset picking
//! - Period estimation (BPM detection and octave correction)
//! - Time signature detection
//! - Chroma extraction
//! - Key detection

pub mod beat_tracking;
pub mod chroma;
pub mod key;
pub mod onset;
pub mod period;
pub mod spectrum;
