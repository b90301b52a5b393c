//! Chroma extraction
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Log-frequency chroma frames
//! - Per-frame normalization and time averaging

pub mod extractor;
pub mod normalization;

pub use extractor::extract_chroma;
pub use normalization::mean_chroma;
