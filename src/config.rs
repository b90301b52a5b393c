//! Configuration parameters for audio analysis

/// How per-band onset differences are folded into one envelope value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Median across mel bands (robust to a single loud band)
    Median,
    /// Arithmetic mean across mel bands
    Mean,
}

/// Onset strength envelope parameters
#[derive(Debug, Clone)]
pub struct OnsetConfig {
    /// STFT frame size (default: 2048)
    pub frame_size: usize,

    /// STFT hop size (default: 512)
    pub hop_size: usize,

    /// Number of mel bands (default: 64)
    pub n_mels: usize,

    /// Lowest mel band edge in Hz (default: 0.0)
    pub fmin: f32,

    /// Highest mel band edge in Hz (default: Nyquist)
    pub fmax: Option<f32>,

    /// Dynamic range kept below the loudest bin, in dB (default: 80.0)
    pub top_db: f32,

    /// Band aggregation (default: Median)
    pub aggregate: Aggregate,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            n_mels: 64,
            fmin: 0.0,
            fmax: None,
            top_db: 80.0,
            aggregate: Aggregate::Median,
        }
    }
}

/// Tempo estimation parameters
#[derive(Debug, Clone)]
pub struct TempoConfig {
    /// Centre of the log-normal tempo prior in BPM (default: 120.0)
    pub start_bpm: f32,

    /// Width of the tempo prior in octaves (default: 2.0)
    pub std_bpm: f32,

    /// Tempi at or above this value are never selected (default: 400.0)
    pub max_tempo: f32,

    /// Autocorrelation window length in seconds (default: 8.0)
    pub ac_size: f32,

    /// Lower edge of the frame-tempo histogram (default: 40.0)
    pub histogram_min_bpm: f32,

    /// Upper edge of the frame-tempo histogram (default: 240.0)
    pub histogram_max_bpm: f32,

    /// Number of histogram bins (default: 50)
    pub histogram_bins: usize,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            std_bpm: 2.0,
            max_tempo: 400.0,
            ac_size: 8.0,
            histogram_min_bpm: 40.0,
            histogram_max_bpm: 240.0,
            histogram_bins: 50,
        }
    }
}

/// Chroma extraction parameters
#[derive(Debug, Clone)]
pub struct ChromaConfig {
    /// STFT frame size; long frames resolve low semitones (default: 8192)
    pub frame_size: usize,

    /// Hop size (default: 2048)
    pub hop_size: usize,

    /// Log-frequency bins per octave before folding (default: 36)
    pub bins_per_octave: usize,

    /// Octaves covered above `fmin` (default: 7)
    pub n_octaves: usize,

    /// Frequency of the first log bin, C1 (default: 32.703 Hz)
    pub fmin: f32,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            frame_size: 8192,
            hop_size: 2048,
            bins_per_octave: 36,
            n_octaves: 7,
            fmin: 32.703_197,
        }
    }
}

/// Time signature detection parameters
#[derive(Debug, Clone)]
pub struct TimeSignatureConfig {
    /// Seconds of audio loaded from the start of the file (default: 30.0)
    pub max_duration_secs: f32,

    /// Samples summed per beat energy measurement (default: 4096)
    pub energy_window: usize,

    /// Beats considered for accent scoring (default: 48)
    pub max_beats: usize,

    /// Minimum beats/energies needed before scoring (default: 8)
    pub min_beats: usize,

    /// Onset envelope parameters (mean aggregation across bands)
    pub onset: OnsetConfig,

    /// Global tempo parameters (prior width 1 octave, ceiling 320 BPM)
    pub tempo: TempoConfig,
}

impl Default for TimeSignatureConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 30.0,
            energy_window: 4096,
            max_beats: 48,
            min_beats: 8,
            onset: OnsetConfig {
                aggregate: Aggregate::Mean,
                ..OnsetConfig::default()
            },
            tempo: TempoConfig {
                std_bpm: 1.0,
                max_tempo: 320.0,
                ..TempoConfig::default()
            },
        }
    }
}

/// Analysis configuration parameters
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Sample rate audio is resampled to before analysis (default: 22050)
    pub sample_rate: u32,

    /// Silence threshold in dBFS; quieter inputs are rejected (default: -80.0)
    pub min_amplitude_db: f32,

    /// Onset envelope parameters
    pub onset: OnsetConfig,

    /// Tempo estimation parameters
    pub tempo: TempoConfig,

    /// Chroma parameters
    pub chroma: ChromaConfig,

    /// Time signature parameters
    pub time_signature: TimeSignatureConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            min_amplitude_db: -80.0,
            onset: OnsetConfig::default(),
            tempo: TempoConfig::default(),
            chroma: ChromaConfig::default(),
            time_signature: TimeSignatureConfig::default(),
        }
    }
}
