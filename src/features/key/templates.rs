//! Krumhansl-Schmuckler key templates
//!
//! Probe-tone profiles for 24 keys (12 major + 12 minor). The C major and
//! C minor profiles are rotated to every tonic and normalised to unit sum.
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*.
//! Oxford University Press.

/// Krumhansl-Schmuckler C major profile
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Schmuckler C minor profile
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates (C, C#, D, ..., B)
    pub major: [[f32; 12]; 12],

    /// Minor key templates (C, C#, D, ..., B)
    pub minor: [[f32; 12]; 12],
}

/// Rotate a profile right by `tonic` semitones and normalise it to unit sum
fn rotate_normalized(profile: &[f32; 12], tonic: usize) -> [f32; 12] {
    let sum: f32 = profile.iter().sum();
    let mut rotated = [0.0f32; 12];
    for (i, slot) in rotated.iter_mut().enumerate() {
        *slot = profile[(i + 12 - tonic % 12) % 12] / sum;
    }
    rotated
}

impl KeyTemplates {
    /// Build templates from the Krumhansl-Schmuckler profiles
    pub fn new() -> Self {
        let mut major = [[0.0f32; 12]; 12];
        let mut minor = [[0.0f32; 12]; 12];
        for tonic in 0..12 {
            major[tonic] = rotate_normalized(&MAJOR_PROFILE, tonic);
            minor[tonic] = rotate_normalized(&MINOR_PROFILE, tonic);
        }
        Self { major, minor }
    }

    /// Major template for a tonic (0 = C, ..., 11 = B)
    pub fn major(&self, tonic: u32) -> &[f32; 12] {
        &self.major[tonic as usize % 12]
    }

    /// Minor template for a tonic (0 = C, ..., 11 = B)
    pub fn minor(&self, tonic: u32) -> &[f32; 12] {
        &self.minor[tonic as usize % 12]
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}
