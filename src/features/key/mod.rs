//! Key detection
//!
//! Detect musical key using:
//! - Krumhansl-Schmuckler templates (24 keys)
//! - Pearson correlation against the mean chroma vector

pub mod detector;
pub mod templates;

pub use detector::{detect_key, pearson_correlation};
pub use templates::KeyTemplates;

use crate::analysis::result::Key;

/// Key detection result
#[derive(Debug, Clone)]
pub struct KeyDetectionResult {
    /// Detected key (best match)
    pub key: Key,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Raw Pearson correlation of the best match (-1 when undefined)
    pub correlation: f32,

    /// All 24 key scores (ranked, highest first)
    pub all_scores: Vec<(Key, f32)>,
}
