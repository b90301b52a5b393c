//! Chroma normalization and aggregation

/// Scale a chroma vector so its largest element is 1
///
/// All-zero (or non-positive) vectors are returned unchanged.
pub fn normalize_max(chroma: &[f32]) -> Vec<f32> {
    let max = chroma.iter().copied().fold(0.0f32, f32::max);
    if max <= f32::EPSILON {
        return chroma.to_vec();
    }
    chroma.iter().map(|&v| v / max).collect()
}

/// Average chroma vectors over time
///
/// # Returns
///
/// A 12-element vector; all zeros for an empty input
pub fn mean_chroma(frames: &[Vec<f32>]) -> Vec<f32> {
    let mut mean = vec![0.0f32; 12];
    if frames.is_empty() {
        return mean;
    }
    for frame in frames {
        for (m, &v) in mean.iter_mut().zip(frame.iter()) {
            *m += v;
        }
    }
    let n = frames.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}
