//! Onset peak picking
//!
//! A frame `n` of the min-max normalised envelope `x` is an onset when:
//!
//! 1. `x[n] == max(x[n - pre_max .. n + post_max])`
//! 2. `x[n] >= mean(x[n - pre_avg .. n + post_avg]) + delta`
//! 3. `n > previous_onset + wait`
//!
//! Windows are clipped at the envelope edges.

/// Peak picking parameters, in frames
#[derive(Debug, Clone)]
pub struct PeakPickParams {
    /// Frames before `n` in the local maximum window
    pub pre_max: usize,
    /// Frames after `n` in the local maximum window
    pub post_max: usize,
    /// Frames before `n` in the moving average window
    pub pre_avg: usize,
    /// Frames after `n` in the moving average window
    pub post_avg: usize,
    /// Minimum frames between consecutive onsets
    pub wait: usize,
    /// Threshold above the moving average
    pub delta: f32,
}

impl PeakPickParams {
    /// Standard windows (30 ms max, 100 ms average, 30 ms wait) for a frame rate
    pub fn for_frame_rate(sample_rate: u32, hop_size: usize) -> Self {
        let frames = |secs: f32| (secs * sample_rate as f32 / hop_size.max(1) as f32) as usize;
        Self {
            pre_max: frames(0.03),
            post_max: frames(0.0) + 1,
            pre_avg: frames(0.10),
            post_avg: frames(0.10) + 1,
            wait: frames(0.03),
            delta: 0.07,
        }
    }
}

/// Detect onset frames in an onset strength envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength, one value per frame
/// * `sample_rate` - Sample rate the envelope was computed at
/// * `hop_size` - Hop between envelope frames in samples
///
/// # Returns
///
/// Ascending onset frame indices (empty for a flat envelope)
pub fn detect_onsets(envelope: &[f32], sample_rate: u32, hop_size: usize) -> Vec<usize> {
    pick_peaks(envelope, &PeakPickParams::for_frame_rate(sample_rate, hop_size))
}

/// Peak picking with explicit parameters
pub fn pick_peaks(envelope: &[f32], params: &PeakPickParams) -> Vec<usize> {
    if envelope.is_empty() {
        return Vec::new();
    }

    let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    let max = envelope.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return Vec::new();
    }
    let x: Vec<f32> = envelope.iter().map(|&v| (v - min) / range).collect();
    let len = x.len();

    let mut onsets = Vec::new();
    let mut last: Option<usize> = None;

    for n in 0..len {
        let max_lo = n.saturating_sub(params.pre_max);
        let max_hi = (n + params.post_max).min(len).max(n + 1);
        let local_max = x[max_lo..max_hi]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        if x[n] != local_max {
            continue;
        }

        let avg_lo = n.saturating_sub(params.pre_avg);
        let avg_hi = (n + params.post_avg).min(len).max(n + 1);
        let window = &x[avg_lo..avg_hi];
        let local_mean = window.iter().sum::<f32>() / window.len() as f32;
        if x[n] < local_mean + params.delta {
            continue;
        }

        if let Some(prev) = last {
            if n <= prev + params.wait {
                continue;
            }
        }

        onsets.push(n);
        last = Some(n);
    }

    log::debug!("Detected {} onsets in {} frames", onsets.len(), len);

    onsets
}

/// Convert frame indices to seconds
pub fn frames_to_seconds(frames: &[usize], sample_rate: u32, hop_size: usize) -> Vec<f32> {
    if sample_rate == 0 {
        return vec![0.0; frames.len()];
    }
    frames
        .iter()
        .map(|&f| (f * hop_size) as f32 / sample_rate as f32)
        .collect()
}
