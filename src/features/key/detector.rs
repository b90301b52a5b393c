//! Key detection algorithm
//!
//! Correlates a time-averaged chroma vector with the 24 Krumhansl-Schmuckler
//! templates and keeps the best match.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.

use super::{templates::KeyTemplates, KeyDetectionResult};
use crate::analysis::result::Key;
use crate::error::AnalysisError;

const EPSILON: f32 = 1e-6;

/// Pearson correlation coefficient of two equally long vectors
///
/// Returns `None` when either vector has zero variance (or the lengths differ).
pub fn pearson_correlation(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&x| x as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&x| x as f64).sum::<f64>() / n;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }
    Some((cov / (var_a.sqrt() * var_b.sqrt())) as f32)
}

/// Detect musical key from a mean chroma vector
///
/// # Arguments
///
/// * `mean_chroma` - 12-element chroma vector averaged over time
/// * `templates` - Key templates
///
/// # Returns
///
/// The best key by Pearson correlation. Keys are tried in tonic order, major
/// before minor, and only a strictly higher correlation replaces the current
/// best; C major stands when no correlation is defined. Confidence is the best
/// correlation clamped to [0, 1]. `all_scores` holds all 24 correlations ranked
/// highest first, with undefined correlations reported as -1.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the chroma vector does not have 12
/// elements.
pub fn detect_key(
    mean_chroma: &[f32],
    templates: &KeyTemplates,
) -> Result<KeyDetectionResult, AnalysisError> {
    if mean_chroma.len() != 12 {
        return Err(AnalysisError::InvalidInput(format!(
            "Chroma vector must have 12 elements, got {}",
            mean_chroma.len()
        )));
    }

    let sum: f32 = mean_chroma.iter().sum();
    let chroma: Vec<f32> = mean_chroma.iter().map(|&v| v / (sum + EPSILON)).collect();

    let mut best_key = Key::Major(0);
    let mut best_correlation = -1.0f32;
    let mut all_scores = Vec::with_capacity(24);

    for tonic in 0..12u32 {
        for key in [Key::Major(tonic), Key::Minor(tonic)] {
            let template = match key {
                Key::Major(t) => templates.major(t),
                Key::Minor(t) => templates.minor(t),
            };
            let correlation = pearson_correlation(&chroma, template);
            if let Some(r) = correlation {
                if r > best_correlation {
                    best_correlation = r;
                    best_key = key;
                }
            }
            all_scores.push((key, correlation.unwrap_or(-1.0)));
        }
    }

    all_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let confidence = best_correlation.clamp(0.0, 1.0);

    log::debug!(
        "Detected key {} (r={:.3}, confidence={:.3})",
        best_key.name(),
        best_correlation,
        confidence
    );

    Ok(KeyDetectionResult {
        key: best_key,
        confidence,
        correlation: best_correlation,
        all_scores,
    })
}
